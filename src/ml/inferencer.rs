// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained classifier from a model directory and
// scores single prepared images. Runs on the plain (non-
// autodiff) backend, so dropout is off and BatchNorm uses its
// running statistics.
use anyhow::{anyhow, bail, Result};
use burn::prelude::*;

use crate::domain::{image::PreparedImage, traits::ImageClassifier};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::CifarClassifier;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:      CifarClassifier<B>,
    image_size: usize,
    device:     B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Load the best checkpoint recorded in `ckpt_manager`'s directory
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        if !ckpt_manager.has_model() {
            bail!(
                "Model not found at '{}', please train first.",
                ckpt_manager.dir().display()
            );
        }

        let cfg   = ckpt_manager.load_config()?;
        let model = cfg.model_config().init::<B>(&device);
        let model = ckpt_manager.load_best(model, &device)?;

        tracing::info!(
            "Model loaded from '{}' ({} parameters)",
            ckpt_manager.dir().display(),
            model.num_params()
        );
        Ok(Self::from_model(model, cfg.image_size, device))
    }

    pub fn from_model(model: CifarClassifier<B>, image_size: usize, device: B::Device) -> Self {
        Self { model, image_size, device }
    }
}

impl<B: Backend> ImageClassifier for Inferencer<B> {
    fn probabilities(&self, image: &PreparedImage) -> Result<Vec<f32>> {
        if image.size != self.image_size {
            bail!(
                "Image is {}x{}, the model expects {}x{}",
                image.size, image.size, self.image_size, self.image_size
            );
        }

        let input = Tensor::<B, 4>::from_data(
            TensorData::new(image.pixels.clone(), image.batch_shape()),
            &self.device,
        );

        self.model
            .probabilities(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {e:?}"))
    }

    fn input_size(&self) -> usize {
        self.image_size
    }
}
