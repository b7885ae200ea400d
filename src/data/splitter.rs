// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// By default the CIFAR-10 test batch is used as the validation
// set. With `--validation-split 0.1` the validation images are
// instead held out from the five training batches, and the test
// batch is not read at all.
//
// The shuffle is seeded so the same split is produced on every
// run with the same `--seed`.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` and split into (train, validation).
///
/// `val_fraction` is clamped to [0, 1]; e.g. 0.2 keeps 80% for training.
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let n_val    = ((total as f64) * val_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = total - n_val.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
