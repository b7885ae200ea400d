// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Locate / extract CIFAR-10     (Layer 4 - data)
//   Step 2: Read training images          (Layer 4 - data)
//   Step 3: Choose validation images      (Layer 4 - data)
//             test batch, or a seeded hold-out
//   Step 4: Build datasets                (Layer 4 - data)
//   Step 5: Save config                   (Layer 6 - infra)
//   Step 6: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    cifar::{CifarLoader, Split},
    dataset::CifarDataset,
    preprocessor::DEFAULT_IMAGE_SIZE,
    splitter::split_train_val,
};
use crate::domain::classes::CIFAR10_CLASSES;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::CifarClassifierConfig,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// weights as model_config.json so inference can rebuild the
// same architecture and input size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:          String,
    pub model_dir:         String,
    pub epochs:            usize,
    pub batch_size:        usize,
    pub lr:                f64,
    pub image_size:        usize,
    pub alpha:             f64,
    pub dense_units:       usize,
    pub dropout:           f64,
    pub patience:          usize,
    pub backbone_weights:  Option<String>,
    pub freeze_backbone:   bool,
    /// Hold out this fraction of the training images instead of
    /// validating on the test batch
    pub validation_split:  Option<f64>,
    pub max_train_samples: Option<usize>,
    pub max_test_samples:  Option<usize>,
    pub num_workers:       usize,
    pub seed:              u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:          "data/cifar-10-batches-bin".to_string(),
            model_dir:         "artifacts".to_string(),
            epochs:            8,
            batch_size:        128,
            lr:                1e-3,
            image_size:        DEFAULT_IMAGE_SIZE,
            alpha:             1.0,
            dense_units:       256,
            dropout:           0.4,
            patience:          2,
            backbone_weights:  None,
            freeze_backbone:   true,
            validation_split:  None,
            max_train_samples: None,
            max_test_samples:  None,
            num_workers:       1,
            seed:              42,
        }
    }
}

impl TrainConfig {
    /// Architecture part of the config
    pub fn model_config(&self) -> CifarClassifierConfig {
        CifarClassifierConfig::new()
            .with_alpha(self.alpha)
            .with_dense_units(self.dense_units)
            .with_dropout(self.dropout)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch size must be at least 1");
        ensure!(self.image_size >= 32, "image size must be at least 32 pixels");
        ensure!(self.alpha > 0.0, "alpha must be positive");
        ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");
        if let Some(split) = self.validation_split {
            ensure!(split > 0.0 && split < 1.0, "validation split must be in (0, 1)");
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 1-3: Load images and pick the validation set ───────────────
        let loader = CifarLoader::new(&cfg.data_dir);
        let train_items = loader.load(Split::Train, cfg.max_train_samples)?;

        let (train_items, val_items) = match cfg.validation_split {
            Some(fraction) => {
                tracing::info!("Holding out {:.0}% of training images for validation", fraction * 100.0);
                split_train_val(train_items, fraction, cfg.seed)
            }
            None => {
                let test_items = loader.load(Split::Test, cfg.max_test_samples)?;
                (train_items, test_items)
            }
        };
        tracing::info!(
            "Dataset: {} training, {} validation images",
            train_items.len(),
            val_items.len()
        );
        ensure!(!train_items.is_empty(), "No training images found in '{}'", cfg.data_dir);
        ensure!(
            !val_items.is_empty(),
            "No validation images: raise --validation-split or --max-test-samples"
        );

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = CifarDataset::new(train_items);
        let val_dataset   = CifarDataset::new(val_items);

        for (class, count) in CIFAR10_CLASSES.iter().zip(train_dataset.class_counts()) {
            tracing::debug!("  {:<10} {}", class.name, count);
        }

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.model_dir);
        ckpt_manager.create_dir()?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::create(&cfg.model_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let summary = run_training(cfg, train_dataset, val_dataset, &ckpt_manager, &metrics)?;

        tracing::info!(
            "Model saved to '{}', metrics in '{}'",
            ckpt_manager.dir().display(),
            metrics.csv_path().display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::data::cifar::{PIXELS_PER_IMAGE, RECORD_LEN};

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.epochs, 8);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.image_size, 96);
        assert_eq!(cfg.patience, 2);
        assert!(cfg.freeze_backbone);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_model_config_carries_architecture() {
        let cfg = TrainConfig { alpha: 0.5, dense_units: 64, dropout: 0.2, ..TrainConfig::default() };
        let model_cfg = cfg.model_config();
        assert_eq!(model_cfg.alpha, 0.5);
        assert_eq!(model_cfg.dense_units, 64);
        assert_eq!(model_cfg.dropout, 0.2);
        assert_eq!(model_cfg.num_classes, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainConfig { epochs: 0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { image_size: 16, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { validation_split: Some(1.0), ..TrainConfig::default() }
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_config_json_uses_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{"image_size": 64}"#).unwrap();
        assert_eq!(cfg.image_size, 64);
        assert_eq!(cfg.dense_units, 256);
    }

    /// Five training batches and a test batch of `per_file` records each
    fn write_batches(dir: &Path, per_file: usize, test_batch: &[u8]) {
        std::fs::create_dir_all(dir).unwrap();
        for i in 1..=5 {
            let bytes: Vec<u8> = (0..per_file)
                .flat_map(|j| {
                    let mut record = vec![(j % 10) as u8];
                    record.extend(std::iter::repeat(j as u8).take(PIXELS_PER_IMAGE));
                    record
                })
                .collect();
            std::fs::write(dir.join(format!("data_batch_{i}.bin")), bytes).unwrap();
        }
        std::fs::write(dir.join("test_batch.bin"), test_batch).unwrap();
    }

    fn config_in(root: &Path) -> TrainConfig {
        TrainConfig {
            data_dir:  root.join("cifar").to_string_lossy().into_owned(),
            model_dir: root.join("artifacts").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_empty_test_batch_limit_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write_batches(&tmp.path().join("cifar"), 4, &[0u8; RECORD_LEN]);

        let cfg = TrainConfig { max_test_samples: Some(0), ..config_in(tmp.path()) };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();

        assert!(err.to_string().contains("No validation images"), "{err}");
        assert!(!tmp.path().join("artifacts/metrics.csv").exists());
    }

    #[test]
    fn test_validation_split_skips_test_batch() {
        let tmp = tempfile::tempdir().unwrap();
        // unreadable as CIFAR-10 records
        write_batches(&tmp.path().join("cifar"), 4, b"not a batch");

        // 5 images * 0.05 rounds to an empty hold-out
        let cfg = TrainConfig {
            validation_split:  Some(0.05),
            max_train_samples: Some(5),
            ..config_in(tmp.path())
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("No validation images"), "{message}");
        assert!(!message.contains("test_batch.bin"), "{message}");
    }

    #[test]
    fn test_missing_dataset_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_dir:  tmp.path().join("cifar").to_string_lossy().into_owned(),
            model_dir: tmp.path().join("artifacts").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("CIFAR-10 batches not found"));
    }
}
