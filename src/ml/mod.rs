// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model architecture, training loop and inference engine.
//
//   mobilenet.rs      — MobileNetV2 feature extractor
//                       (inverted residual blocks, ReLU6)
//
//   model.rs          — Backbone + classification top:
//                       GAP → BN → Dense(256) → Dropout → Dense(10)
//
//   early_stopping.rs — Patience-based stop on validation accuracy
//
//   trainer.rs        — Epoch loop: forward, loss, backward, Adam
//                       step, validation, checkpoint per epoch
//
//   inferencer.rs     — Loads the best checkpoint and returns
//                       class probabilities for one image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sandler et al. (2018) MobileNetV2

/// MobileNetV2 backbone
pub mod mobilenet;

/// CIFAR-10 classifier on top of the backbone
pub mod model;

pub mod early_stopping;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and scores images
pub mod inferencer;
