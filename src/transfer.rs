//! The client-side transfer controller.
//!
//! Owns the end-to-end submission lifecycle: validating the input file,
//! uploading it, retrying transient failures with exponential backoff,
//! simulating progress while the server works, and saving the returned
//! binary under a derived filename.
//!
//! Retry policy: connection-level failures and upstream-unavailable statuses
//! (502/504) are retried up to the attempt budget with delays of
//! `base × 2^(attempt−1)`. Every other non-success status is a terminal
//! failure with zero retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::progress::{ProgressSink, ProgressTicker};

/// Total attempts per submission (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_TICK_STEP: u8 = 5;

/// One submission's transient state.
///
/// Created per call to [`TransferController::submit`], mutated only by the
/// controller, and discarded when the call returns — it has no durable
/// identity.
#[derive(Debug)]
struct UploadSession {
    file: PathBuf,
    attempt_count: u32,
    progress_percent: u8,
    terminal_state: TerminalState,
}

#[derive(Debug, PartialEq, Eq)]
enum TerminalState {
    Pending,
    Success,
    Error,
}

impl UploadSession {
    fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            attempt_count: 0,
            progress_percent: 0,
            terminal_state: TerminalState::Pending,
        }
    }
}

/// Outcome of a single upload attempt.
enum Attempt {
    Success(Vec<u8>),
    Retryable(Error),
    Fatal(Error),
}

/// Client component managing upload, retry, progress, and download.
pub struct TransferController {
    client: reqwest::Client,
    endpoint: String,
    max_attempts: u32,
    backoff_base: Duration,
    tick_interval: Duration,
    tick_step: u8,
}

impl TransferController {
    /// Create a controller targeting the given format endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            tick_step: DEFAULT_TICK_STEP,
        }
    }

    /// Override the retry budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Override the backoff base delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Override the progress simulation cadence.
    pub fn with_ticker(mut self, interval: Duration, step: u8) -> Self {
        self.tick_interval = interval;
        self.tick_step = step;
        self
    }

    /// Upload `file`, await the formatted document, and save it into
    /// `out_dir` under a derived filename.
    ///
    /// Progress reported to `sink` is monotonic and stays below 100 until
    /// the terminal outcome is known; the final report is always 100 — on
    /// failure too, so an observing UI unblocks either way.
    pub async fn submit(
        &self,
        file: &Path,
        out_dir: &Path,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<PathBuf> {
        let contents = tokio::fs::read(file)
            .await
            .map_err(|err| Error::input(format!("cannot read '{}': {err}", file.display())))?;
        if contents.is_empty() {
            return Err(Error::input(format!("'{}' is empty", file.display())));
        }
        let upload_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("transcript.txt")
            .to_string();

        let mut session = UploadSession::new(file);

        // The ticker lives exactly as long as the network exchange; it is
        // stopped on every path below (and aborts on drop if this future is
        // cancelled), so no timer leaks across submissions.
        let ticker = ProgressTicker::start(sink.clone(), self.tick_interval, self.tick_step);
        let outcome = self
            .request_with_retry(&contents, &upload_name, &mut session)
            .await;
        ticker.stop().await;

        session.progress_percent = 100;
        sink.on_progress(100);

        match outcome {
            Ok(document) => {
                session.terminal_state = TerminalState::Success;
                let target = out_dir.join(derived_filename(&session.file));
                tokio::fs::write(&target, &document).await.map_err(|err| {
                    Error::transfer(None, format!("cannot save '{}': {err}", target.display()))
                })?;
                info!(
                    attempts = session.attempt_count,
                    progress = session.progress_percent,
                    saved = %target.display(),
                    "submission succeeded"
                );
                Ok(target)
            }
            Err(err) => {
                session.terminal_state = TerminalState::Error;
                info!(
                    attempts = session.attempt_count,
                    state = ?session.terminal_state,
                    "submission failed"
                );
                Err(err)
            }
        }
    }

    async fn request_with_retry(
        &self,
        contents: &[u8],
        upload_name: &str,
        session: &mut UploadSession,
    ) -> Result<Vec<u8>> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            session.attempt_count = attempt;
            match self.send_once(contents, upload_name).await {
                Attempt::Success(bytes) => return Ok(bytes),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retryable(err) => {
                    warn!(attempt, error = %err, "retryable transfer failure");
                    last_error = Some(err);
                }
            }
            let delay = self.backoff_base * 2u32.pow(attempt - 1);
            tokio::time::sleep(delay).await;
        }

        Err(last_error.unwrap_or_else(|| Error::transfer(None, "retry budget exhausted")))
    }

    async fn send_once(&self, contents: &[u8], upload_name: &str) -> Attempt {
        let part = match reqwest::multipart::Part::bytes(contents.to_vec())
            .file_name(upload_name.to_string())
            .mime_str("text/plain")
        {
            Ok(part) => part,
            Err(err) => return Attempt::Fatal(Error::transfer(None, err.to_string())),
        };
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = match self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return Attempt::Retryable(Error::transfer(
                    None,
                    format!("request failed: {err}"),
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(bytes) => Attempt::Success(bytes.to_vec()),
                Err(err) => Attempt::Retryable(Error::transfer(
                    None,
                    format!("failed to read response body: {err}"),
                )),
            };
        }

        let body = response.text().await.unwrap_or_default();
        let err = Error::transfer(Some(status.as_u16()), &body);
        if matches!(status.as_u16(), 502 | 504) {
            Attempt::Retryable(err)
        } else {
            Attempt::Fatal(err)
        }
    }
}

/// Name the saved document after its source: extension replaced with
/// `.docx`, stem prefixed.
pub fn derived_filename(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("transcript");
    format!("formatted_{stem}.docx")
}
