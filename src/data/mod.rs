// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between bytes on disk and tensors on the device.
//
//   cifar-10-binary.tar.gz / *.bin
//       │
//       ▼
//   CifarLoader       → reads 3073-byte records (label + CHW pixels)
//       │
//       ▼
//   split_train_val   → optional hold-out validation set
//       │
//       ▼
//   CifarDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → upsample + normalise via Preprocessor
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// The Preprocessor is also what the web server runs on uploads.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CIFAR-10 binary batches, extracting the archive if needed
pub mod cifar;

/// Implements Burn's Dataset trait for CIFAR-10 items
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Decode, resize and normalise images
pub mod preprocessor;

/// Seeded shuffle and train/validation split
pub mod splitter;
