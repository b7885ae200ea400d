// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights as gzipped half-precision
// MessagePack records (Burn's NamedMpkGzFileRecorder).
//
// Model directory layout:
//   artifacts/
//     model_config.json      ← TrainConfig (architecture + input size)
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     best_epoch.json        ← epoch with the best validation accuracy
//     metrics.csv            ← see metrics.rs
//
// Inference always loads the best epoch, which is how the
// "restore best weights" half of early stopping is realised.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::mobilenet::MobileNetV2;
use crate::ml::model::CifarClassifier;

const CONFIG_FILE: &str = "model_config.json";
const BEST_EPOCH_FILE: &str = "best_epoch.json";
const RECORD_EXTENSION: &str = ".mpk.gz";

/// Writes `<path>.mpk.gz`
pub type CheckpointRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point the manager at a model directory (not created yet)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory; called once before training writes anything
    pub fn create_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model directory '{}'", self.dir.display()))
    }

    /// True when a config and a best checkpoint pointer both exist
    pub fn has_model(&self) -> bool {
        self.dir.join(CONFIG_FILE).is_file() && self.dir.join(BEST_EPOCH_FILE).is_file()
    }

    /// Save model weights for a given epoch.
    /// The recorder appends the `.mpk.gz` extension itself.
    pub fn save_model<B: Backend>(&self, model: &CifarClassifier<B>, epoch: usize) -> Result<()> {
        let path = self.epoch_path(epoch);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Remember `epoch` as the one inference should load
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        let path = self.dir.join(BEST_EPOCH_FILE);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }

    /// Load the best checkpoint into a freshly initialised model.
    /// The model must have the architecture stored in model_config.json.
    pub fn load_best<B: Backend>(
        &self,
        model:  CifarClassifier<B>,
        device: &B::Device,
    ) -> Result<CifarClassifier<B>> {
        let epoch = self.best_epoch()?;
        let path  = self.epoch_path(epoch);

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Model not found at '{}', please train first.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    pub fn best_epoch(&self) -> Result<usize> {
        let path = self.dir.join(BEST_EPOCH_FILE);

        let s = fs::read_to_string(&path)
            .with_context(|| {
                format!("Model not found at '{}', please train first.", path.display())
            })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }

    fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }
}

/// Load pretrained backbone weights from a `CheckpointRecorder` file.
/// `path` may be given with or without the `.mpk.gz` extension.
pub fn load_backbone<B: Backend>(
    backbone: MobileNetV2<B>,
    path:     impl AsRef<Path>,
    device:   &B::Device,
) -> Result<MobileNetV2<B>> {
    let path = strip_record_extension(path.as_ref());
    let record = CheckpointRecorder::new()
        .load(path.clone(), device)
        .with_context(|| {
            format!("Cannot load backbone weights from '{}{}'", path.display(), RECORD_EXTENSION)
        })?;
    Ok(backbone.load_record(record))
}

fn strip_record_extension(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_suffix(RECORD_EXTENSION) {
        Some(stem) => PathBuf::from(stem),
        None       => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CifarClassifierConfig;

    type TestBackend = burn::backend::NdArray;

    fn save_backbone(backbone: &MobileNetV2<TestBackend>, path: &Path) {
        CheckpointRecorder::new()
            .record(backbone.clone().into_record(), strip_record_extension(path))
            .unwrap();
    }

    fn small_model(device: &<TestBackend as Backend>::Device) -> CifarClassifier<TestBackend> {
        CifarClassifierConfig::new()
            .with_alpha(0.35)
            .with_dense_units(8)
            .init(device)
    }

    #[test]
    fn test_strip_record_extension() {
        assert_eq!(
            strip_record_extension(Path::new("w/mobilenet.mpk.gz")),
            PathBuf::from("w/mobilenet")
        );
        assert_eq!(
            strip_record_extension(Path::new("w/mobilenet")),
            PathBuf::from("w/mobilenet")
        );
    }

    #[test]
    fn test_missing_model_message() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        assert!(!ckpt.has_model());
        let err = ckpt.load_config().unwrap_err();
        assert!(err.to_string().contains("please train first"));
    }

    #[test]
    fn test_config_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        let cfg = TrainConfig { epochs: 3, image_size: 64, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.image_size, 64);
    }

    #[test]
    fn test_best_checkpoint_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        let device = Default::default();

        let trained = small_model(&device);
        ckpt.save_model(&trained, 2).unwrap();
        ckpt.mark_best(2).unwrap();
        ckpt.save_config(&TrainConfig::default()).unwrap();
        assert!(ckpt.has_model());
        assert_eq!(ckpt.best_epoch().unwrap(), 2);

        let images = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let expected = trained.forward(images.clone()).into_data().to_vec::<f32>().unwrap();

        let restored = ckpt.load_best(small_model(&device), &device).unwrap();
        let actual = restored.forward(images).into_data().to_vec::<f32>().unwrap();

        // half precision on disk
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() <= 0.05 * e.abs().max(1.0), "{a} vs {e}");
        }
    }

    #[test]
    fn test_checkpoint_file_name() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        let device = Default::default();

        ckpt.save_model(&small_model(&device), 1).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["model_epoch_1.mpk.gz".to_string()]);
    }

    #[test]
    fn test_backbone_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model = small_model(&device);
        let path = tmp.path().join("backbone.mpk.gz");

        save_backbone(&model.backbone, &path);
        assert!(path.is_file());

        let fresh = small_model(&device).backbone;
        assert!(load_backbone(fresh, &path, &device).is_ok());
    }
}
