//! Background batch worker.
//!
//! Runs the executor on a dedicated thread and streams events back to
//! the invoking context over an mpsc channel. The invoker never shares
//! mutable state with the worker: it hands over a queue snapshot and
//! listens on the receiver.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vpc_core::runner::{BatchExecutor, CancelHandle, RunConfig, RunSummary, RunnerError, RunnerEvent};

/// A batch run in progress on a worker thread.
pub struct WorkerHandle {
    /// Ordered event stream from the worker.
    pub events: Receiver<RunnerEvent>,
    /// Cooperative cancellation handle (stops at the next item boundary).
    pub cancel: CancelHandle,
    /// Join handle yielding the run summary.
    handle: JoinHandle<Result<RunSummary, RunnerError>>,
}

impl WorkerHandle {
    /// Wait for the run to finish and return its summary.
    ///
    /// A panic on the worker thread is resumed on the caller.
    pub fn join(self) -> Result<RunSummary, RunnerError> {
        self.handle
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    }
}

/// Start a batch run on a dedicated worker thread.
pub fn start_run(snapshot: Vec<PathBuf>, config: RunConfig) -> WorkerHandle {
    let executor = Arc::new(BatchExecutor::new());
    let cancel = executor.cancel_handle();
    let (sender, events) = channel();

    let handle = thread::spawn(move || executor.run(&snapshot, &config, &sender));

    WorkerHandle {
        events,
        cancel,
        handle,
    }
}
