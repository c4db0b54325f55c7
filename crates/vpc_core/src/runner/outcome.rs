//! Per-item outcomes and the aggregate run summary.

use std::path::PathBuf;

/// Terminal classification of one job item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The script exited with status 0.
    Success,
    /// Non-zero exit or an invocation fault, with the diagnostic text.
    Failure(String),
    /// The run was cancelled before this item was attempted.
    ///
    /// The sequential executor never records this per item (a cancelled
    /// run simply ends early); front-ends may use it to label the run's
    /// terminal state.
    Cancelled,
    /// The invocation exceeded the per-process timeout.
    TimedOut,
}

impl JobOutcome {
    /// Whether this outcome counts as successful.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }

    /// Human-readable message for completion notifications.
    pub fn message(&self) -> String {
        match self {
            JobOutcome::Success => "Success".to_string(),
            JobOutcome::Failure(reason) => reason.clone(),
            JobOutcome::Cancelled => "Cancelled".to_string(),
            JobOutcome::TimedOut => "Timeout exceeded".to_string(),
        }
    }
}

/// Outcome of one attempted item.
#[derive(Debug, Clone)]
pub struct ItemReport {
    /// Input file path.
    pub input: PathBuf,
    /// Output path the script was asked to write.
    pub output: PathBuf,
    /// Classified outcome.
    pub outcome: JobOutcome,
}

/// Aggregate result of one complete (or cancelled) batch run.
///
/// Counts cover only items actually attempted; items after a
/// cancellation point are absent from `outcomes`.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Items that completed successfully.
    pub successful: usize,
    /// Items that failed or timed out.
    pub failed: usize,
    /// Ordered per-item outcomes, one per attempted item.
    pub outcomes: Vec<ItemReport>,
    /// True if the run ended early on user request.
    pub cancelled: bool,
}

impl RunSummary {
    /// Number of items actually attempted.
    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }
}
