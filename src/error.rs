use thiserror::Error as ThisError;

/// Galley's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length of a diagnostic payload carried inside an error message.
///
/// Upstream services can return arbitrarily large bodies on failure; we cap
/// what we embed so error messages stay readable in logs and UIs.
pub const DIAGNOSTIC_CAP: usize = 300;

/// Galley's crate-wide error type.
///
/// One variant per failure class in the formatting pipeline. Of these, only
/// `TemplateExtraction` is recoverable: the pipeline substitutes default
/// styles and keeps going. Every other variant is terminal for the current
/// request and is surfaced to the caller as-is.
#[derive(Debug, ThisError)]
pub enum Error {
    /// No usable transcript input was provided.
    #[error("invalid input: {0}")]
    Input(String),

    /// The upload or download failed after the retry budget was exhausted,
    /// or the server returned a non-success status.
    ///
    /// `status` is `None` when the failure happened below HTTP (connection
    /// refused, timeout). The message carries a truncated response body for
    /// diagnostics.
    #[error("transfer failed: {message}")]
    Transfer {
        status: Option<u16>,
        message: String,
    },

    /// The reference document could not be read or parsed.
    ///
    /// Never escapes the pipeline: extraction degrades to default styles.
    #[error("template extraction failed: {0}")]
    TemplateExtraction(String),

    /// The classification capability was unreachable, timed out, or returned
    /// something that is not JSON at all.
    #[error("classification failed: {0}")]
    Classification(String),

    /// The classification capability returned JSON that does not conform to
    /// the transcript document schema or violates its invariants.
    #[error("classifier output did not match the expected schema: {0}")]
    Schema(String),

    /// The final document could not be constructed.
    #[error("document assembly failed: {0}")]
    Assembly(String),
}

impl Error {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Build a `Transfer` error, truncating the diagnostic body.
    pub(crate) fn transfer(status: Option<u16>, body: impl AsRef<str>) -> Self {
        let truncated = truncate_diagnostic(body.as_ref());
        let message = match status {
            Some(code) => format!("status {code}: {truncated}"),
            None => truncated,
        };
        Self::Transfer { status, message }
    }

    pub(crate) fn template(message: impl Into<String>) -> Self {
        Self::TemplateExtraction(message.into())
    }

    pub(crate) fn classification(message: impl Into<String>) -> Self {
        Self::Classification(truncate_diagnostic(&message.into()))
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub(crate) fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly(message.into())
    }
}

/// Cap a diagnostic string at [`DIAGNOSTIC_CAP`] characters.
///
/// Operates on characters rather than bytes so truncation never splits a
/// multi-byte glyph (transcripts are full of them).
pub(crate) fn truncate_diagnostic(s: &str) -> String {
    let mut out: String = s.chars().take(DIAGNOSTIC_CAP).collect();
    if out.len() < s.len() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_error_includes_status_and_body() {
        let err = Error::transfer(Some(502), "upstream fell over");
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("upstream fell over"));
    }

    #[test]
    fn transfer_error_without_status_keeps_body_only() {
        let err = Error::transfer(None, "connection refused");
        let rendered = err.to_string();
        assert!(rendered.contains("connection refused"));
        assert!(!rendered.contains("status"));
    }

    #[test]
    fn diagnostics_are_truncated() {
        let long = "x".repeat(DIAGNOSTIC_CAP * 2);
        let err = Error::transfer(Some(500), &long);
        let Error::Transfer { message, .. } = &err else {
            panic!("expected Transfer");
        };
        assert!(message.len() < long.len());
        assert!(message.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "♪".repeat(DIAGNOSTIC_CAP + 10);
        let truncated = truncate_diagnostic(&long);
        assert_eq!(
            truncated.chars().filter(|c| *c == '♪').count(),
            DIAGNOSTIC_CAP
        );
    }
}
