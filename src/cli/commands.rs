// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `serve` and `predict`.
// Server flags can also be set through CIFAR_* environment
// variables.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::prediction::DEFAULT_TOP_K;
use crate::server::{ServeConfig, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune MobileNetV2 on CIFAR-10
    Train(TrainArgs),

    /// Run the upload web server with a trained model
    Serve(ServeArgs),

    /// Classify image files and print the JSON report
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with the CIFAR-10 binary batches (or the .tar.gz archive)
    #[arg(long, default_value = "data/cifar-10-batches-bin")]
    pub data_dir: String,

    /// Where checkpoints, config and metrics are written
    #[arg(long, default_value = "artifacts")]
    pub model_dir: String,

    #[arg(long, default_value_t = 8)]
    pub epochs: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Side length images are upsampled to before the backbone
    #[arg(long, default_value_t = 96)]
    pub image_size: usize,

    /// MobileNetV2 width multiplier
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Units in the hidden dense layer of the classification top
    #[arg(long, default_value_t = 256)]
    pub dense_units: usize,

    #[arg(long, default_value_t = 0.4)]
    pub dropout: f64,

    /// Epochs without validation-accuracy improvement before stopping
    #[arg(long, default_value_t = 2)]
    pub patience: usize,

    /// Pretrained backbone weights (Burn record, .mpk.gz)
    #[arg(long)]
    pub backbone_weights: Option<String>,

    /// Fine-tune the pretrained backbone instead of freezing it
    #[arg(long)]
    pub no_freeze_backbone: bool,

    /// Validate on this fraction of the training images instead of the test batch
    #[arg(long)]
    pub validation_split: Option<f64>,

    /// Cap the number of training images (quick runs)
    #[arg(long)]
    pub max_train_samples: Option<usize>,

    /// Cap the number of test images (quick runs)
    #[arg(long)]
    pub max_test_samples: Option<usize>,

    /// Data loader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:          a.data_dir,
            model_dir:         a.model_dir,
            epochs:            a.epochs,
            batch_size:        a.batch_size,
            lr:                a.lr,
            image_size:        a.image_size,
            alpha:             a.alpha,
            dense_units:       a.dense_units,
            dropout:           a.dropout,
            patience:          a.patience,
            backbone_weights:  a.backbone_weights,
            freeze_backbone:   !a.no_freeze_backbone,
            validation_split:  a.validation_split,
            max_train_samples: a.max_train_samples,
            max_test_samples:  a.max_test_samples,
            num_workers:       a.num_workers,
            seed:              a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "CIFAR_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(long, env = "CIFAR_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory written by `train`
    #[arg(long, env = "CIFAR_MODEL_DIR", default_value = "artifacts")]
    pub model_dir: String,

    /// Uploaded files are saved here
    #[arg(long, env = "CIFAR_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "CIFAR_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Must contain index.html
    #[arg(long, env = "CIFAR_TEMPLATES_DIR", default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Upload request body limit in bytes
    #[arg(long, env = "CIFAR_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,
}

impl From<ServeArgs> for ServeConfig {
    fn from(a: ServeArgs) -> Self {
        ServeConfig {
            bind:             a.bind,
            port:             a.port,
            model_dir:        a.model_dir,
            upload_dir:       a.upload_dir,
            static_dir:       a.static_dir,
            templates_dir:    a.templates_dir,
            max_upload_bytes: a.max_upload_bytes,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image files to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    #[arg(long, default_value = "artifacts")]
    pub model_dir: String,

    /// Number of ranked predictions to report
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["cifar10-classifier", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 8);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.image_size, 96);
        assert!(cfg.freeze_backbone);
        assert_eq!(cfg.backbone_weights, None);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "cifar10-classifier", "train",
            "--epochs", "3",
            "--backbone-weights", "weights/mobilenet_v2.mpk.gz",
            "--no-freeze-backbone",
            "--validation-split", "0.1",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 3);
        assert!(!cfg.freeze_backbone);
        assert_eq!(cfg.validation_split, Some(0.1));
        assert_eq!(cfg.backbone_weights.as_deref(), Some("weights/mobilenet_v2.mpk.gz"));
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["cifar10-classifier", "serve", "--port", "8080"]).unwrap();
        let Commands::Serve(args) = cli.command else { panic!("expected serve") };
        let cfg: ServeConfig = args.into();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
        assert_eq!(cfg.max_upload_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_predict_needs_an_image() {
        assert!(Cli::try_parse_from(["cifar10-classifier", "predict"]).is_err());

        let cli = Cli::try_parse_from(["cifar10-classifier", "predict", "cat.png", "--top-k", "3"])
            .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.images, vec![PathBuf::from("cat.png")]);
        assert_eq!(args.top_k, 3);
    }
}
