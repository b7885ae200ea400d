// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on Autodiff<Wgpu>; model.valid() gives the
//     same weights on plain Wgpu for the validation pass
//   - With a frozen backbone only the classification top gets
//     gradients, so Adam only updates those parameters
//   - Every epoch is checkpointed; the best one (validation
//     accuracy) is recorded in best_epoch.json
//   - Early stopping ends the run after `patience` epochs
//     without improvement
//
// The loop is generic over the autodiff backend so it can be
// exercised on NdArray in tests.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::CifarDataset};
use crate::infra::{
    checkpoint::{load_backbone, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::early_stopping::{EarlyStopping, Verdict};
use crate::ml::model::{count_correct, CifarClassifier};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs_run:        usize,
    pub best_epoch:        Option<usize>,
    pub best_val_accuracy: Option<f64>,
    pub stopped_early:     bool,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: CifarDataset,
    val_dataset:   CifarDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<TrainingSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, metrics, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: CifarDataset,
    val_dataset:   CifarDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingSummary> {

    ensure!(!train_dataset.is_empty(), "training set is empty");
    ensure!(!val_dataset.is_empty(), "validation set is empty");

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: CifarClassifier<B> = cfg.model_config().init(&device);

    let pretrained = match &cfg.backbone_weights {
        Some(path) => {
            tracing::info!("Loading backbone weights from '{}'", path);
            let backbone = load_backbone(model.backbone.clone(), path, &device)?;
            model = model.with_backbone(backbone);
            true
        }
        None => {
            tracing::warn!("No backbone weights given, training MobileNetV2 from scratch");
            false
        }
    };
    let frozen = pretrained && cfg.freeze_backbone;

    tracing::info!(
        "Model ready: {} parameters ({} in {}-block backbone, {}), input {}x{}",
        model.num_params(),
        model.backbone.num_params(),
        model.backbone.num_blocks(),
        if frozen { "frozen" } else { "trainable" },
        cfg.image_size,
        cfg.image_size,
    );

    // ── Adam optimiser (Keras defaults) ───────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = ImageBatcher::<B>::new(device.clone(), cfg.image_size);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    let val_batcher = ImageBatcher::<B::InnerBackend>::new(device.clone(), cfg.image_size);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    let mut stopper       = EarlyStopping::new(cfg.patience);
    let mut epochs_run    = 0;
    let mut stopped_early = false;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut train_correct  = 0usize;
        let mut train_seen     = 0usize;

        for batch in train_loader.iter() {
            train_seen += batch.targets.dims()[0];

            let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone(), frozen);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            train_correct  += count_correct(logits.detach(), batch.targets);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = mean(train_loss_sum, train_batches);
        let train_acc  = ratio(train_correct, train_seen);

        // ── Validation phase ──────────────────────────────────────────────────
        // Inner backend: dropout off, BatchNorm uses running statistics
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut val_correct  = 0usize;
        let mut val_seen     = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.images);
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.targets.clone());

            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;
            val_seen     += batch.targets.dims()[0];
            val_correct  += count_correct(logits, batch.targets);
        }

        let val_loss = mean(val_loss_sum, val_batches);
        let val_acc  = ratio(val_correct, val_seen);

        // ── Bookkeeping ───────────────────────────────────────────────────────
        let verdict  = stopper.observe(epoch, val_acc);
        let improved = verdict == Verdict::Improved;

        ckpt_manager.save_model(&model, epoch)?;
        if improved {
            ckpt_manager.mark_best(epoch)?;
        }
        metrics.log(&EpochMetrics { epoch, train_loss, train_acc, val_loss, val_acc, best: improved })?;
        epochs_run = epoch;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.2}% | val_loss={:.4} | val_acc={:.2}%{}",
            epoch, cfg.epochs, train_loss, train_acc * 100.0,
            val_loss, val_acc * 100.0,
            if improved { " *" } else { "" },
        );

        if let Verdict::Wait { epochs_without_improvement } = verdict {
            tracing::info!(
                "val_acc did not improve ({}/{})",
                epochs_without_improvement,
                cfg.patience
            );
        }
        if verdict == Verdict::Stop {
            tracing::info!(
                "Early stopping: no improvement in val_acc for {} epochs",
                cfg.patience
            );
            stopped_early = true;
            break;
        }
    }

    let summary = TrainingSummary {
        epochs_run,
        best_epoch:        stopper.best_epoch(),
        best_val_accuracy: stopper.best(),
        stopped_early,
    };
    tracing::info!("Training complete: {:?}", summary);
    Ok(summary)
}

fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

fn ratio(correct: usize, total: usize) -> f64 {
    if total > 0 { correct as f64 / total as f64 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{cifar::PIXELS_PER_IMAGE, dataset::CifarItem};

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    fn items(n: usize) -> Vec<CifarItem> {
        (0..n)
            .map(|i| CifarItem { pixels: vec![(i * 40 % 256) as u8; PIXELS_PER_IMAGE], label: i % 10 })
            .collect()
    }

    fn tiny_config(model_dir: &str) -> TrainConfig {
        TrainConfig {
            model_dir:   model_dir.to_string(),
            epochs:      2,
            batch_size:  2,
            image_size:  32,
            alpha:       0.35,
            dense_units: 8,
            patience:    5,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_mean_and_ratio_of_nothing() {
        assert!(mean(1.0, 0).is_nan());
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(3, 4), 0.75);
    }

    #[test]
    fn test_train_loop_writes_checkpoints_and_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(&tmp.path().to_string_lossy());
        let ckpt = CheckpointManager::new(tmp.path());
        let metrics = MetricsLogger::create(tmp.path()).unwrap();

        let summary = train_loop::<TestBackend>(
            &cfg,
            CifarDataset::new(items(4)),
            CifarDataset::new(items(2)),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap();

        assert_eq!(summary.epochs_run, 2);
        assert!(!summary.stopped_early);
        // the first finite accuracy is always an improvement
        assert_eq!(ckpt.best_epoch().unwrap(), summary.best_epoch.unwrap());
        assert!(tmp.path().join("model_epoch_1.mpk.gz").is_file());
        assert!(tmp.path().join("model_epoch_2.mpk.gz").is_file());

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_early_stopping_ends_run() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            epochs:   10,
            patience: 1,
            ..tiny_config(&tmp.path().to_string_lossy())
        };
        let ckpt = CheckpointManager::new(tmp.path());
        let metrics = MetricsLogger::create(tmp.path()).unwrap();

        // one validation image scores 0.0 or 1.0, so at most one epoch
        // after the first can improve
        let summary = train_loop::<TestBackend>(
            &cfg,
            CifarDataset::new(items(4)),
            CifarDataset::new(items(1)),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap();

        assert!(summary.stopped_early);
        assert!((2..=3).contains(&summary.epochs_run), "{}", summary.epochs_run);
        assert_eq!(summary.best_epoch, Some(summary.epochs_run - 1));
    }

    #[test]
    fn test_empty_validation_set_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(&tmp.path().to_string_lossy());
        let ckpt = CheckpointManager::new(tmp.path());
        let metrics = MetricsLogger::create(tmp.path()).unwrap();

        let err = train_loop::<TestBackend>(
            &cfg,
            CifarDataset::new(items(4)),
            CifarDataset::new(Vec::new()),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("validation set is empty"));
        assert!(!tmp.path().join("model_epoch_1.mpk.gz").exists());
    }
}
