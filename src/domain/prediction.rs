// ============================================================
// Layer 3 — Prediction Report
// ============================================================
// Turns the raw softmax output of the model (10 probabilities
// in label order) into the JSON-ready structure the server and
// the `predict` command return:
//
//   top_predictions   — the k most likely classes, best first
//   all_probabilities — every class, in label order
//
// Probabilities are reported as percentages rounded to two
// decimal places, e.g. 0.87654 → 87.65.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::classes::{CIFAR10_CLASSES, NUM_CLASSES};

/// Number of entries in `top_predictions` by default
pub const DEFAULT_TOP_K: usize = 5;

/// One entry of the ranked top-k list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    #[serde(rename = "class")]
    pub class_name:  String,
    pub emoji:       String,
    pub confidence:  f64,
    pub color:       String,
    pub description: String,
}

/// One entry of the full probability list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    #[serde(rename = "class")]
    pub class_name:  String,
    pub probability: f64,
    pub color:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub top_predictions:   Vec<ClassPrediction>,
    pub all_probabilities: Vec<ClassProbability>,
}

impl PredictionReport {
    /// Build a report from a probability vector in label order.
    ///
    /// Fails if `probs` does not hold exactly one value per class.
    pub fn from_probabilities(probs: &[f32], top_k: usize) -> Result<Self> {
        if probs.len() != NUM_CLASSES {
            bail!(
                "Expected {} class probabilities, model returned {}",
                NUM_CLASSES,
                probs.len()
            );
        }

        let top_predictions = ranked_indices(probs)
            .into_iter()
            .take(top_k)
            .map(|idx| {
                let cls = &CIFAR10_CLASSES[idx];
                ClassPrediction {
                    class_name:  cls.name.to_string(),
                    emoji:       cls.emoji.to_string(),
                    confidence:  to_percent(probs[idx]),
                    color:       cls.color.to_string(),
                    description: cls.description.to_string(),
                }
            })
            .collect();

        let all_probabilities = CIFAR10_CLASSES
            .iter()
            .zip(probs)
            .map(|(cls, &p)| ClassProbability {
                class_name:  cls.name.to_string(),
                probability: to_percent(p),
                color:       cls.color.to_string(),
            })
            .collect();

        Ok(Self { top_predictions, all_probabilities })
    }

    /// The single most likely class, if any
    pub fn best(&self) -> Option<&ClassPrediction> {
        self.top_predictions.first()
    }
}

/// Indices sorted by descending probability.
/// The sort is stable, so equal probabilities keep label order.
pub fn ranked_indices(probs: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..probs.len()).collect();
    indices.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));
    indices
}

/// Probability in [0, 1] → percentage rounded to 2 decimals
pub fn to_percent(p: f32) -> f64 {
    round2(p as f64 * 100.0)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs() -> Vec<f32> {
        vec![0.01, 0.02, 0.05, 0.60, 0.02, 0.20, 0.03, 0.04, 0.02, 0.01]
    }

    #[test]
    fn test_top_predictions_are_sorted() {
        let report = PredictionReport::from_probabilities(&probs(), DEFAULT_TOP_K).unwrap();
        let names: Vec<&str> = report
            .top_predictions
            .iter()
            .map(|p| p.class_name.as_str())
            .collect();
        assert_eq!(names, ["Cat", "Dog", "Bird", "Horse", "Frog"]);
        assert_eq!(report.best().unwrap().confidence, 60.0);
        assert_eq!(report.best().unwrap().emoji, "🐱");
    }

    #[test]
    fn test_all_probabilities_keep_label_order() {
        let report = PredictionReport::from_probabilities(&probs(), DEFAULT_TOP_K).unwrap();
        assert_eq!(report.all_probabilities.len(), NUM_CLASSES);
        assert_eq!(report.all_probabilities[0].class_name, "Airplane");
        assert_eq!(report.all_probabilities[5].probability, 20.0);
        assert_eq!(report.all_probabilities[9].color, "#14b8a6");
    }

    #[test]
    fn test_ties_keep_lower_index_first() {
        let ranked = ranked_indices(&[0.1, 0.3, 0.3, 0.3]);
        assert_eq!(ranked, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(to_percent(0.876_54), 87.65);
        assert_eq!(to_percent(0.0), 0.0);
        assert_eq!(to_percent(1.0), 100.0);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert!(PredictionReport::from_probabilities(&[0.5, 0.5], 5).is_err());
    }

    #[test]
    fn test_json_uses_class_key() {
        let report = PredictionReport::from_probabilities(&probs(), 1).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["top_predictions"][0]["class"], "Cat");
        assert_eq!(json["all_probabilities"][3]["class"], "Cat");
        assert_eq!(json["top_predictions"].as_array().unwrap().len(), 1);
    }
}
