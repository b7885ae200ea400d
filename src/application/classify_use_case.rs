// ============================================================
// Layer 2 — ClassifyUseCase
// ============================================================
// Loads the trained model once and classifies images from disk:
//
//   path → Preprocessor → ImageClassifier → PredictionReport
//
// The web server runs the same preprocess → classify → report
// steps on uploaded bytes instead of a file path.

use anyhow::{Context, Result};
use std::path::Path;

use crate::data::preprocessor::Preprocessor;
use crate::domain::{prediction::PredictionReport, traits::ImageClassifier};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct ClassifyUseCase {
    classifier:   Box<dyn ImageClassifier>,
    preprocessor: Preprocessor,
}

impl ClassifyUseCase {
    /// Load the best checkpoint from `model_dir` on the default GPU device
    pub fn new(model_dir: &str) -> Result<Self> {
        Ok(Self::with_classifier(load_classifier(model_dir)?))
    }

    pub fn with_classifier(classifier: Box<dyn ImageClassifier>) -> Self {
        let preprocessor = Preprocessor::new(classifier.input_size());
        Self { classifier, preprocessor }
    }

    pub fn classify_path(&self, path: impl AsRef<Path>, top_k: usize) -> Result<PredictionReport> {
        let path  = path.as_ref();
        let image = self.preprocessor.prepare_path(path)?;
        let probs = self.classifier
            .probabilities(&image)
            .with_context(|| format!("Inference failed for '{}'", path.display()))?;
        PredictionReport::from_probabilities(&probs, top_k)
    }
}

/// Load the trained classifier from `model_dir` on the default Wgpu device
pub fn load_classifier(model_dir: &str) -> Result<Box<dyn ImageClassifier>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    let ckpt   = CheckpointManager::new(model_dir);
    let inferencer = Inferencer::<InferBackend>::from_checkpoint(&ckpt, device)?;
    Ok(Box::new(inferencer))
}
