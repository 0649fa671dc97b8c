//! The classified transcript data model and its boundary schema.
//!
//! This is the only shape that crosses the classifier boundary: whatever the
//! classification capability does internally, it must hand back a
//! `TranscriptDocument` in exactly this JSON form. Validation here is strict
//! on purpose — a malformed payload is rejected rather than patched up, so a
//! misbehaving capability can never smuggle a half-broken document into the
//! assembler.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A contiguous span of text sharing one formatting decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

/// A paragraph decomposed into styled text runs.
///
/// Invariant: the concatenation of `runs[i].text` equals `text`. A paragraph
/// with no runs is legal and renders as one implicit run with
/// category-default styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifiedParagraph {
    pub text: String,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl ClassifiedParagraph {
    /// A paragraph with no explicit runs (rendered with category defaults).
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
        }
    }
}

/// The classified transcript, in presentation order.
///
/// An empty `title` is permitted and renders as a blank heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptDocument {
    #[serde(default)]
    pub title: String,
    pub paragraphs: Vec<ClassifiedParagraph>,
}

impl TranscriptDocument {
    /// Check the schema invariants that serde cannot express.
    ///
    /// Rejects any paragraph whose runs do not concatenate back to its full
    /// text. Ordering and non-overlap follow from the same check: runs are
    /// consumed in sequence, so any gap, overlap, or reordering shows up as a
    /// concatenation mismatch.
    pub fn validate(&self) -> Result<()> {
        for (idx, paragraph) in self.paragraphs.iter().enumerate() {
            if paragraph.runs.is_empty() {
                continue;
            }
            let joined: String = paragraph
                .runs
                .iter()
                .map(|run| run.text.as_str())
                .collect();
            if joined != paragraph.text {
                return Err(Error::schema(format!(
                    "paragraph {idx}: run concatenation does not match the paragraph text"
                )));
            }
        }
        Ok(())
    }
}
