//! `galley` — a transcript formatting pipeline.
//!
//! This crate turns unstructured plain-text transcripts into styled Word
//! documents whose look mirrors a reference document. It provides:
//! - Style extraction from a reference .docx
//! - Content classification (hosted AI capability or deterministic rules)
//! - Document assembly into the target binary format
//! - A resilient client-side transfer controller (upload, retry, progress,
//!   download)
//!
//! The library is designed to be used by both the bundled server and CLI
//! binaries and by other frontends, with an emphasis on strict boundary
//! validation and minimal surprises.

// High-level API (most consumers should start here).
pub mod config;
pub mod pipeline;

// Error taxonomy shared by every stage.
pub mod error;

// Transcript data model and boundary schema.
pub mod transcript;

// Style rules and their extraction from the reference document.
pub mod style;
pub mod template;

// Content classification: the boundary trait and its implementations.
pub mod chunker;
pub mod classifier;
pub mod claude;
pub mod rules;

// Rendering into the target document format.
pub mod assembler;

// Client-side submission lifecycle.
pub mod progress;
pub mod transfer;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Galley;
pub use style::StyleProfile;
pub use transcript::TranscriptDocument;
pub use transfer::TransferController;
