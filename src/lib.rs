//! `scrivener` — transcribe text out of scanned document images.
//!
//! Each image is classified as handwritten or printed, routed to a matching transcription
//! backend, and the result is written next to it (or into an output directory) as a `.txt` file.
//!
//! This crate provides:
//! - The routing decision (label + confidence → backend)
//! - A per-item pipeline and a failure-isolating batch runner
//! - Adapter traits for the classifier and both transcription backends
//! - Concrete adapters: an OpenAI-compatible cloud transcriber, and (behind the `onnx` feature)
//!   ONNX Runtime document classifier and handwriting line recognizer

// High-level API (most consumers should start here).
pub mod opts;
pub mod scrivener;

// Routing decision and the label vocabulary it works on.
pub mod classification;
pub mod label;
pub mod router;

// Adapter interfaces and built-in adapters.
pub mod backend;
pub mod backends;

// Input validation, prompt loading, and output persistence.
pub mod image_file;
pub mod persist;
pub mod prompt;

// Directory scanning and batch tallies.
pub mod batch;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use backend::{Classifier, CloudTranscriber, LocalRecognizer, TranscriptionOutcome};
pub use batch::BatchSummary;
pub use classification::{ClassificationResult, Prediction};
pub use error::{BackendError, Error, Result, ValidationIssue};
pub use label::{DocumentClass, TextKind};
pub use opts::Opts;
pub use router::{BackendKind, RoutingDecision, route};
pub use scrivener::{ProcessedItem, Scrivener};

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
