//! Progress tracking for validation runs.

use crate::core::result::ValidationStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// A run has started.
    Started {
        total_operators: usize,
    },
    /// An operator's check has started.
    OperatorStarted {
        operator: String,
        index: usize,
        total: usize,
    },
    /// An operator's check has produced a result.
    OperatorCompleted {
        operator: String,
        status: ValidationStatus,
        duration_ms: u64,
        index: usize,
        total: usize,
    },
    /// An operator was never called because the run was cancelled.
    OperatorSkipped {
        operator: String,
    },
    /// Overall progress percentage.
    Progress {
        percent: f32,
        elapsed_ms: u64,
        estimated_remaining_ms: Option<u64>,
    },
    /// The run has finished.
    Completed {
        total_duration_ms: u64,
        operators_validated: usize,
        operators_skipped: usize,
    },
    /// The run stopped early.
    Cancelled,
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks progress of one validation run.
///
/// Shared by reference across worker threads when checks run in parallel.
pub struct ProgressTracker {
    total_operators: usize,
    completed: AtomicU64,
    skipped: AtomicU64,
    start_time: Option<Instant>,
    callback: Option<Arc<ProgressCallback>>,
    /// Per-check durations for estimation.
    durations: parking_lot::Mutex<Vec<u64>>,
}

impl ProgressTracker {
    pub fn new(total_operators: usize) -> Self {
        Self {
            total_operators,
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            start_time: None,
            callback: None,
            durations: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_operators: self.total_operators,
        });
    }

    pub fn operator_started(&self, operator: &str) {
        let completed = self.completed.load(Ordering::Relaxed) as usize;
        self.send_update(ProgressUpdate::OperatorStarted {
            operator: operator.to_string(),
            index: completed,
            total: self.total_operators,
        });
    }

    pub fn operator_completed(&self, operator: &str, status: ValidationStatus, duration_ms: u64) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) as usize + 1;
        self.durations.lock().push(duration_ms);

        self.send_update(ProgressUpdate::OperatorCompleted {
            operator: operator.to_string(),
            status,
            duration_ms,
            index: completed,
            total: self.total_operators,
        });
        self.send_progress_update();
    }

    pub fn operator_skipped(&self, operator: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::OperatorSkipped {
            operator: operator.to_string(),
        });
    }

    /// Report that the run stopped early.
    pub fn cancelled(&self) {
        self.send_update(ProgressUpdate::Cancelled);
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed_ms(),
            operators_validated: self.completed.load(Ordering::Relaxed) as usize,
            operators_skipped: self.skipped.load(Ordering::Relaxed) as usize,
        });
    }

    /// Current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_operators == 0 {
            return 100.0;
        }
        let done = self.completed.load(Ordering::Relaxed) + self.skipped.load(Ordering::Relaxed);
        (done as f32 / self.total_operators as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let durations = self.durations.lock();
        if durations.is_empty() {
            return None;
        }

        let average = durations.iter().sum::<u64>() / durations.len() as u64;
        let completed = self.completed.load(Ordering::Relaxed) as usize;
        let remaining = self.total_operators.saturating_sub(completed);
        Some(average * remaining as u64)
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }

    fn send_progress_update(&self) {
        self.send_update(ProgressUpdate::Progress {
            percent: self.progress_percent(),
            elapsed_ms: self.elapsed_ms(),
            estimated_remaining_ms: self.estimated_remaining_ms(),
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_progress_calculation() {
        let tracker = ProgressTracker::new(4);
        assert_eq!(tracker.progress_percent(), 0.0);

        tracker.operator_completed("a", ValidationStatus::Success, 10);
        tracker.operator_completed("b", ValidationStatus::Failure, 30);
        assert_eq!(tracker.progress_percent(), 50.0);
        assert_eq!(tracker.estimated_remaining_ms(), Some(40));

        tracker.operator_skipped("c");
        tracker.operator_skipped("d");
        assert_eq!(tracker.progress_percent(), 100.0);
    }

    #[test]
    fn test_empty_run_is_complete() {
        let tracker = ProgressTracker::default();
        assert_eq!(tracker.progress_percent(), 100.0);
        assert_eq!(tracker.estimated_remaining_ms(), None);
    }

    #[test]
    fn test_callback_invoked() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counter = call_count.clone();
        let callback: ProgressCallback = Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let mut tracker = ProgressTracker::new(1).with_callback(Arc::new(callback));
        tracker.start();
        tracker.operator_started("lvm");
        tracker.operator_completed("lvm", ValidationStatus::Success, 5);
        tracker.complete();

        // Started, OperatorStarted, OperatorCompleted, Progress, Completed
        assert_eq!(call_count.load(Ordering::Relaxed), 5);
    }
}
