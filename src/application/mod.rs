// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each. No model
// math and no printing here; the CLI (Layer 1) decides what to
// show the user.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Load CIFAR-10, train, checkpoint
pub mod train_use_case;

// Classify image files with the best checkpoint
pub mod classify_use_case;

// Load the model and run the web server
pub mod serve_use_case;
