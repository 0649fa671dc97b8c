//! The classification boundary.
//!
//! Content classification is an externally supplied capability: something
//! that takes raw transcript text (plus an optional excerpt of the reference
//! document) and returns a [`TranscriptDocument`]. It may be an AI service,
//! it may be a deterministic rule engine, and it may be non-deterministic —
//! the core never depends on how it decides, only on the schema it returns.

use async_trait::async_trait;

use crate::error::Result;
use crate::transcript::TranscriptDocument;

/// An opaque content-classification capability.
///
/// Implementors must be `Send + Sync` so a boxed classifier can be shared by
/// a server handling concurrent requests.
///
/// # Arguments
/// * `transcript` – raw transcript text.
/// * `style_context` – optional textual excerpt of the reference document,
///   used to bias category and emphasis inference.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        transcript: &str,
        style_context: Option<&str>,
    ) -> Result<TranscriptDocument>;
}
