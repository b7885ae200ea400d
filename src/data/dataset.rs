use burn::data::dataset::Dataset;
use image::{Rgb, RgbImage};

use crate::data::cifar::CIFAR_SIDE;

/// One raw CIFAR-10 image with its label.
/// Pixels are kept as the 3072 bytes of the binary format (CHW).
#[derive(Debug, Clone)]
pub struct CifarItem {
    pub pixels: Vec<u8>,
    pub label:  usize,
}

impl CifarItem {
    /// Rebuild an interleaved RGB image from the planar bytes
    pub fn to_rgb_image(&self) -> RgbImage {
        let plane = CIFAR_SIDE * CIFAR_SIDE;
        let side = CIFAR_SIDE as u32;
        RgbImage::from_fn(side, side, |x, y| {
            let i = (y * side + x) as usize;
            Rgb([
                self.pixels[i],
                self.pixels[plane + i],
                self.pixels[2 * plane + i],
            ])
        })
    }
}

pub struct CifarDataset {
    items: Vec<CifarItem>,
}

impl CifarDataset {
    pub fn new(items: Vec<CifarItem>) -> Self { Self { items } }

    /// Number of items per label, in label order
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; crate::domain::classes::NUM_CLASSES];
        for item in &self.items {
            counts[item.label] += 1;
        }
        counts
    }
}

impl Dataset<CifarItem> for CifarDataset {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cifar::PIXELS_PER_IMAGE;

    #[test]
    fn test_planes_are_interleaved() {
        let mut pixels = vec![0u8; PIXELS_PER_IMAGE];
        let plane = CIFAR_SIDE * CIFAR_SIDE;
        // pixel (x=1, y=0)
        pixels[1] = 10;
        pixels[plane + 1] = 20;
        pixels[2 * plane + 1] = 30;

        let img = CifarItem { pixels, label: 0 }.to_rgb_image();
        assert_eq!(img.dimensions(), (32, 32));
        assert_eq!(img.get_pixel(1, 0), &Rgb([10, 20, 30]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_dataset_trait() {
        let items = vec![
            CifarItem { pixels: vec![0; PIXELS_PER_IMAGE], label: 2 },
            CifarItem { pixels: vec![0; PIXELS_PER_IMAGE], label: 2 },
            CifarItem { pixels: vec![0; PIXELS_PER_IMAGE], label: 7 },
        ];
        let ds = CifarDataset::new(items);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.get(2).unwrap().label, 7);
        assert!(ds.get(3).is_none());
        assert_eq!(ds.class_counts()[2], 2);
    }
}
