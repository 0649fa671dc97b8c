//! Simulated upload progress.
//!
//! The server path is not instrumented, so the Transfer Controller shows a
//! UX proxy instead of true progress: a ticker that climbs from 0 toward a
//! ceiling below 100 while the request is in flight. Only the controller
//! ever reports 100, and only once the terminal outcome is known.
//!
//! The ticker is an owned value scoped to a single submission. Dropping it
//! aborts the timer task, so the controller cannot leak tickers across
//! requests no matter how the submission ends.

use std::sync::Arc;
use std::time::Duration;

/// Highest value the simulation may report; the remaining headroom is
/// reserved for the real outcome.
pub const SIMULATED_CEILING: u8 = 90;

/// Observer for progress updates.
///
/// Implementations must tolerate being called from a timer task.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

/// A cancellable, owned progress timer.
pub struct ProgressTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl ProgressTicker {
    /// Start ticking: every `interval`, advance by `step` (saturating at the
    /// ceiling) and report to `sink`. The task stops on its own once the
    /// ceiling is reached.
    pub fn start(sink: Arc<dyn ProgressSink>, interval: Duration, step: u8) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval completes immediately;
            // consume it so the first report lands one interval in.
            ticker.tick().await;

            let mut current = 0u8;
            loop {
                ticker.tick().await;
                current = current.saturating_add(step).min(SIMULATED_CEILING);
                sink.on_progress(current);
                if current >= SIMULATED_CEILING {
                    return;
                }
            }
        });
        Self { handle }
    }

    /// Abort the timer task and wait for it to wind down.
    ///
    /// Waiting matters: a tick already past its await point still runs to
    /// completion, and the controller's terminal report must come after the
    /// last simulated value.
    pub async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
