// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the model directory on disk:
//
//   checkpoint.rs — Model weights as gzipped Burn records,
//                   the TrainConfig as JSON (so inference can
//                   rebuild the architecture), the best-epoch
//                   pointer and pretrained backbone records.
//
//   metrics.rs    — Per-epoch loss/accuracy rows in a CSV file.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
