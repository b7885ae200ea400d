// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<CifarItem>
// into model-ready tensors.
//
// Each 32×32 CIFAR-10 image is upsampled to the model input
// size (96×96 by default) with the same Preprocessor the web
// server uses, so train-time and serve-time inputs match.
//
//   Input:  N items of 3072 bytes each
//   Output: images  [N, 3, S, S]  f32 in [0, 1]
//           targets [N]           label indices
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{dataset::CifarItem, preprocessor::Preprocessor};

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// shape: [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,

    /// shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Tensors are created on the device the batcher was built with,
/// so training (Autodiff) and validation (inner backend) each get
/// their own batcher.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device:       B::Device,
    preprocessor: Preprocessor,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, preprocessor: Preprocessor::new(image_size) }
    }
}

impl<B: Backend> Batcher<B, CifarItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<CifarItem>, _device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let size = self.preprocessor.size();

        let mut pixels  = Vec::with_capacity(batch_size * 3 * size * size);
        let mut targets = Vec::with_capacity(batch_size);

        for item in &items {
            let prepared = self.preprocessor.prepare_rgb(&item.to_rgb_image());
            pixels.extend_from_slice(&prepared.pixels);
            targets.push(item.label as i64);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, size, size]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}
