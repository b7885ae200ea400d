// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The server and the `predict` command only need "something
// that turns a prepared image into class probabilities". They
// program against this trait, so the HTTP layer can be tested
// with a stub and never touches a GPU.
//
// Implementations:
//   - Inferencer<B>   → the trained Burn model (Layer 5)
//   - test stubs      → fixed probability vectors

use anyhow::Result;

use crate::domain::image::PreparedImage;

// ─── ImageClassifier ──────────────────────────────────────────────────────────
/// Any component that can score an image against the class table.
pub trait ImageClassifier: Send {
    /// Return one probability per class, in label order.
    fn probabilities(&self, image: &PreparedImage) -> Result<Vec<f32>>;

    /// Side length the classifier expects its input resized to.
    fn input_size(&self) -> usize;
}
