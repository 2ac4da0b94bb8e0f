//! Progress reporting and cooperative cancellation

use crate::error::{DomainError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One progress notification
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completion on a 0-100 scale; never decreases within one operation
    pub percentage: f64,
    /// Short name of the step that just finished
    pub stage: &'static str,
    /// Time since the operation started
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// True once the operation has reported 100
    pub fn is_complete(&self) -> bool {
        self.percentage >= 100.0
    }
}

/// Receiver of progress notifications
pub trait ProgressSink: Send + Sync {
    /// Called whenever an operation makes progress
    fn on_progress(&self, update: &ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Monotone 0-100 reporter used inside one operation
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    current: f64,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            current: 0.0,
            started: Instant::now(),
        }
    }

    /// Report `percentage`, clamped to 0-100; lower values than the last
    /// report are raised to it
    pub fn report(&mut self, percentage: f64, stage: &'static str) {
        let percentage = percentage.clamp(0.0, 100.0).max(self.current);
        self.current = percentage;
        if let Some(sink) = &self.sink {
            sink.on_progress(&ProgressUpdate {
                percentage,
                stage,
                elapsed: self.started.elapsed(),
            });
        }
    }

    /// Move forward by `delta` points
    pub fn advance(&mut self, delta: f64, stage: &'static str) {
        self.report(self.current + delta, stage);
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_sink", &self.sink.is_some())
            .field("current", &self.current)
            .finish()
    }
}

/// Cooperative cancellation flag shared between a caller and an operation
///
/// Operations poll it between engine calls, never during one.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(CANCELLED)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DomainError::cancelled())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_sink() -> (Arc<Mutex<Vec<f64>>>, Arc<dyn ProgressSink>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |update: &ProgressUpdate| sink_seen.lock().unwrap().push(update.percentage);
        (seen, Arc::new(sink))
    }

    #[test]
    fn test_reporter_is_monotone_and_clamped() {
        let (seen, sink) = recording_sink();
        let mut reporter = ProgressReporter::new(Some(sink));

        reporter.report(10.0, "loaded");
        reporter.report(5.0, "loaded");
        reporter.advance(40.0, "merging");
        reporter.report(250.0, "complete");

        assert_eq!(*seen.lock().unwrap(), vec![10.0, 10.0, 50.0, 100.0]);
        assert_eq!(reporter.current(), 100.0);
    }

    #[test]
    fn test_only_final_update_is_complete() {
        let completed = Arc::new(Mutex::new(Vec::new()));
        let sink_completed = Arc::clone(&completed);
        let sink = move |update: &ProgressUpdate| {
            sink_completed
                .lock()
                .unwrap()
                .push((update.stage, update.is_complete()))
        };
        let mut reporter = ProgressReporter::new(Some(Arc::new(sink)));

        reporter.report(99.5, "writing");
        reporter.report(120.0, "complete");

        assert_eq!(
            *completed.lock().unwrap(),
            vec![("writing", false), ("complete", true)]
        );
    }

    #[test]
    fn test_reporter_without_sink() {
        let mut reporter = ProgressReporter::new(None);
        reporter.report(42.0, "writing");
        assert_eq!(reporter.current(), 42.0);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }
}
