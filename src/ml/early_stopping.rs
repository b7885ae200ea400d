// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Watches validation accuracy after every epoch and decides
// whether training should continue.
//
//   - An epoch "improves" when its accuracy beats the best seen
//     so far (ties do not count).
//   - After `patience` epochs in a row without improvement the
//     trainer stops.
//   - The best epoch is remembered so its checkpoint can be
//     restored for inference.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// New best value; this epoch's weights should be kept
    Improved,
    /// No improvement, training continues
    Wait { epochs_without_improvement: usize },
    /// Patience exhausted
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:   usize,
    best:       Option<f64>,
    best_epoch: Option<usize>,
    wait:       usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: None, best_epoch: None, wait: 0 }
    }

    /// Record the monitored value (higher is better) for `epoch`
    pub fn observe(&mut self, epoch: usize, value: f64) -> Verdict {
        let improved = match self.best {
            None       => !value.is_nan(),
            Some(best) => value > best,
        };

        if improved {
            self.best       = Some(value);
            self.best_epoch = Some(epoch);
            self.wait       = 0;
            return Verdict::Improved;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Wait { epochs_without_improvement: self.wait }
        }
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_after_patience() {
        let mut es = EarlyStopping::new(2);
        assert_eq!(es.observe(1, 0.50), Verdict::Improved);
        assert_eq!(es.observe(2, 0.60), Verdict::Improved);
        assert_eq!(es.observe(3, 0.55), Verdict::Wait { epochs_without_improvement: 1 });
        assert_eq!(es.observe(4, 0.60), Verdict::Stop);
        assert_eq!(es.best_epoch(), Some(2));
        assert_eq!(es.best(), Some(0.60));
    }

    #[test]
    fn test_improvement_resets_wait() {
        let mut es = EarlyStopping::new(2);
        es.observe(1, 0.5);
        es.observe(2, 0.4);
        assert_eq!(es.observe(3, 0.7), Verdict::Improved);
        assert_eq!(es.observe(4, 0.6), Verdict::Wait { epochs_without_improvement: 1 });
        assert_eq!(es.best_epoch(), Some(3));
    }

    #[test]
    fn test_equal_value_is_not_improvement() {
        let mut es = EarlyStopping::new(1);
        es.observe(1, 0.5);
        assert_eq!(es.observe(2, 0.5), Verdict::Stop);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut es = EarlyStopping::new(3);
        assert_eq!(es.observe(1, f64::NAN), Verdict::Wait { epochs_without_improvement: 1 });
        assert_eq!(es.best_epoch(), None);
    }
}
