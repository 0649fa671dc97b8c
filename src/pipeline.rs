//! High-level API for running the formatting pipeline.
//!
//! We expose a single entry point (`Galley`) that wires the stages together:
//! style extraction from the reference document, content classification
//! through whatever capability the caller configured, and document assembly.
//!
//! The intent is:
//! - Construct once, share behind an `Arc`, format many transcripts.
//! - Each request re-reads the reference document (no stale-style bugs).
//! - Pacing between full runs is enforced here, not by callers.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::assembler;
use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::rules::RuleClassifier;
use crate::style::StyleProfile;
use crate::template;

/// The main formatting entry point.
///
/// Owns the configured classification capability, the reference-document
/// path, and the run-cooldown state.
pub struct Galley {
    classifier: Box<dyn Classifier>,
    fallback: Option<Box<dyn Classifier>>,
    template_path: Option<PathBuf>,
    run_cooldown: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl Galley {
    /// Create a pipeline around a classification capability.
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            fallback: None,
            template_path: None,
            run_cooldown: Duration::ZERO,
            last_run: Mutex::new(None),
        }
    }

    /// Use the reference document at `path` for style extraction and
    /// classifier context. Without one, the documented defaults apply.
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Substitute the deterministic rule engine when the configured
    /// capability fails, instead of failing the request.
    pub fn with_rule_fallback(mut self) -> Self {
        self.fallback = Some(Box::new(RuleClassifier));
        self
    }

    /// Enforce a minimum gap between consecutive full runs.
    pub fn with_run_cooldown(mut self, cooldown: Duration) -> Self {
        self.run_cooldown = cooldown;
        self
    }

    /// Format a raw transcript into a .docx binary.
    pub async fn format(&self, transcript: &str) -> Result<Vec<u8>> {
        if transcript.trim().is_empty() {
            return Err(Error::input("transcript is empty"));
        }

        self.await_cooldown().await;

        let styles = match &self.template_path {
            Some(path) => template::extract(path),
            None => StyleProfile::default_profile(),
        };
        let context = self
            .template_path
            .as_deref()
            .and_then(template::context_excerpt);

        let document = match self
            .classifier
            .classify(transcript, context.as_deref())
            .await
        {
            Ok(document) => Ok(document),
            // Capability-side failures (unreachable, garbage output) may be
            // covered by the rule engine; anything else stays terminal.
            Err(err @ (Error::Classification(_) | Error::Schema(_))) => match &self.fallback {
                Some(fallback) => {
                    warn!(error = %err, "capability failed, using rule fallback");
                    fallback.classify(transcript, context.as_deref()).await
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }?;

        info!(
            title = %document.title,
            paragraphs = document.paragraphs.len(),
            "transcript classified"
        );

        assembler::assemble(&document, &styles)
    }

    /// Sleep out the remainder of the cooldown window.
    ///
    /// The lock is held across the sleep on purpose: concurrent runs queue
    /// behind it, which is exactly the pacing the cooldown exists to
    /// provide.
    async fn await_cooldown(&self) {
        let mut last_run = self.last_run.lock().await;
        if let Some(previous) = *last_run {
            let elapsed = previous.elapsed();
            if elapsed < self.run_cooldown {
                tokio::time::sleep(self.run_cooldown - elapsed).await;
            }
        }
        *last_run = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::transcript::TranscriptDocument;

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(
            &self,
            _transcript: &str,
            _style_context: Option<&str>,
        ) -> Result<TranscriptDocument> {
            Err(Error::classification("capability unreachable"))
        }
    }

    #[tokio::test]
    async fn formats_with_the_rule_engine() -> Result<()> {
        let galley = Galley::new(Box::new(RuleClassifier));
        let bytes = galley
            .format("Show Title\n\nDr. Billy Wilson: \"Be still\"\n")
            .await?;
        assert_eq!(&bytes[..2], b"PK");
        Ok(())
    }

    #[tokio::test]
    async fn empty_transcripts_are_rejected() {
        let galley = Galley::new(Box::new(RuleClassifier));
        let err = galley.format("   \n  ").await.unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[tokio::test]
    async fn capability_failure_is_terminal_without_fallback() {
        let galley = Galley::new(Box::new(FailingClassifier));
        let err = galley.format("Title\n\nbody").await.unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[tokio::test]
    async fn capability_failure_uses_the_rule_fallback_when_enabled() -> Result<()> {
        let galley = Galley::new(Box::new(FailingClassifier)).with_rule_fallback();
        let bytes = galley.format("Title\n\nAnnouncer: welcome back").await?;
        assert_eq!(&bytes[..2], b"PK");
        Ok(())
    }

    #[tokio::test]
    async fn consecutive_runs_respect_the_cooldown() -> Result<()> {
        let galley = Galley::new(Box::new(RuleClassifier))
            .with_run_cooldown(Duration::from_millis(60));
        let started = std::time::Instant::now();
        galley.format("Title\n\nfirst run").await?;
        galley.format("Title\n\nsecond run").await?;
        assert!(started.elapsed() >= Duration::from_millis(60));
        Ok(())
    }

    #[tokio::test]
    async fn missing_template_means_default_styles() -> Result<()> {
        // A nonexistent reference must degrade, not fail.
        let galley = Galley::new(Box::new(RuleClassifier))
            .with_template("definitely/not/there.docx");
        let bytes = galley.format("Title\n\nnarration line").await?;
        assert_eq!(&bytes[..2], b"PK");
        Ok(())
    }
}
