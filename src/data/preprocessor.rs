// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Converts an arbitrary input image into the exact layout the
// model was trained on. Training batches and web uploads both
// go through this code, so the two can never drift apart.
//
// Steps (applied in order):
//   1. Decode the bytes (PNG, JPEG, ... — whatever `image` reads)
//   2. Convert to 8-bit RGB (drops alpha, expands grayscale)
//   3. Resize to size × size with a bilinear (triangle) filter
//   4. Scale every channel value to [0, 1] by dividing by 255
//   5. Lay the pixels out channel-first: R plane, G plane, B plane
//
// Reference: image crate documentation (imageops::resize)

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::path::Path;

use crate::domain::image::PreparedImage;

/// Default model input side length (MobileNetV2 at 96×96)
pub const DEFAULT_IMAGE_SIZE: usize = 96;

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: usize,
}

impl Preprocessor {
    /// Create a preprocessor producing `size × size` images
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Decode an in-memory encoded image (e.g. an HTTP upload)
    pub fn prepare_bytes(&self, bytes: &[u8]) -> Result<PreparedImage> {
        let img = image::load_from_memory(bytes)
            .context("Cannot decode image data")?;
        Ok(self.prepare(&img))
    }

    /// Decode an image file from disk
    pub fn prepare_path(&self, path: impl AsRef<Path>) -> Result<PreparedImage> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("Cannot open image '{}'", path.display()))?;
        Ok(self.prepare(&img))
    }

    /// Convert, resize and normalise an already decoded image
    pub fn prepare(&self, img: &DynamicImage) -> PreparedImage {
        self.prepare_rgb(&img.to_rgb8())
    }

    pub fn prepare_rgb(&self, img: &RgbImage) -> PreparedImage {
        let side = self.size as u32;
        if img.width() == side && img.height() == side {
            return PreparedImage::new(normalized_chw(img), self.size);
        }
        let resized = image::imageops::resize(img, side, side, FilterType::Triangle);
        PreparedImage::new(normalized_chw(&resized), self.size)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

/// RGB image → channel-first f32 values in [0, 1]
pub fn normalized_chw(img: &RgbImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (i, pixel) in img.pixels().enumerate() {
        for channel in 0..3 {
            data[channel * plane + i] = pixel[channel] as f32 / 255.0;
        }
    }

    data
}
