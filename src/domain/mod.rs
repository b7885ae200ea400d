// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that describe what the system
// talks about: the ten CIFAR-10 classes, a ranked prediction
// report, and the classifier abstraction the server uses.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The fixed CIFAR-10 label table with display metadata
pub mod classes;

// A decoded, resized and normalised image ready for the model
pub mod image;

// Ranked class probabilities returned to clients
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
