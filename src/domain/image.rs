// ============================================================
// Layer 3 — Prepared Image
// ============================================================
// A single RGB image after preprocessing, stored channel-first
// (all red values, then green, then blue) because Burn's Conv2d
// expects NCHW input. Values are already scaled to [0, 1].

/// A square RGB image ready to be stacked into a model batch
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// CHW pixel values, length = 3 * size * size
    pub pixels: Vec<f32>,

    /// Side length in pixels (width == height)
    pub size: usize,
}

impl PreparedImage {
    pub fn new(pixels: Vec<f32>, size: usize) -> Self {
        debug_assert_eq!(pixels.len(), 3 * size * size);
        Self { pixels, size }
    }

    /// Tensor shape of this image with a batch dimension of one
    pub fn batch_shape(&self) -> [usize; 4] {
        [1, 3, self.size, self.size]
    }
}
