//! Sequential batch executor.
//!
//! Consumes a queue snapshot, invokes the processing script once per
//! item in order, classifies each outcome, and reports everything
//! through an [`EventSink`]. One run at a time; cancellation is a
//! shared flag polled between items.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::config::{RunConfig, ValidationError};
use super::events::{EventSink, RunnerEvent};
use super::outcome::{ItemReport, JobOutcome, RunSummary};
use super::process::{ProcessInvoker, ProcessStatus, ScriptInvoker};

/// Executor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    /// No run has started yet.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run processed every item.
    Completed,
    /// The last run ended early on user request.
    Cancelled,
}

/// Errors that prevent a run from starting.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Only one run may be active at a time.
    #[error("a run is already in progress")]
    AlreadyRunning,

    /// Pre-run validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Handle for requesting cancellation of a running batch.
///
/// Cancellation is cooperative: the flag is checked once per item, and
/// an in-flight subprocess is never force-terminated by the executor
/// (it runs to completion or its own timeout first).
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation. The run stops at the next item boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs one batch of job items sequentially.
pub struct BatchExecutor {
    /// Lifecycle state, guarding against concurrent runs.
    state: Arc<Mutex<ExecutorState>>,
    /// Cooperative cancellation flag, shared with [`CancelHandle`]s.
    cancelled: Arc<AtomicBool>,
    /// Invoker override for tests; production builds one per run from
    /// the configured script.
    invoker: Option<Box<dyn ProcessInvoker>>,
}

impl BatchExecutor {
    /// Create an executor that invokes the configured script.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ExecutorState::Idle)),
            cancelled: Arc::new(AtomicBool::new(false)),
            invoker: None,
        }
    }

    /// Create an executor with a custom process invoker.
    pub fn with_invoker(invoker: Box<dyn ProcessInvoker>) -> Self {
        Self {
            invoker: Some(invoker),
            ..Self::new()
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutorState {
        *self.state.lock()
    }

    /// Check if a run is in progress.
    pub fn is_running(&self) -> bool {
        self.state() == ExecutorState::Running
    }

    /// Get a cancellation handle for the current or next run.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Run the batch over a queue snapshot.
    ///
    /// Rejected if a run is already active or validation fails; per-item
    /// failures never abort the batch. Returns the summary over items
    /// actually attempted.
    pub fn run(
        &self,
        snapshot: &[PathBuf],
        config: &RunConfig,
        sink: &dyn EventSink,
    ) -> Result<RunSummary, RunnerError> {
        {
            let mut state = self.state.lock();
            if *state == ExecutorState::Running {
                return Err(RunnerError::AlreadyRunning);
            }
            *state = ExecutorState::Running;
        }
        self.cancelled.store(false, Ordering::SeqCst);

        if let Err(e) = config.validate() {
            *self.state.lock() = ExecutorState::Idle;
            return Err(e.into());
        }

        let script_invoker;
        let invoker: &dyn ProcessInvoker = match &self.invoker {
            Some(custom) => custom.as_ref(),
            None => {
                script_invoker = ScriptInvoker::new(&config.script).with_timeout(config.timeout);
                &script_invoker
            }
        };

        let summary = self.run_loop(snapshot, config, invoker, sink);

        *self.state.lock() = if summary.cancelled {
            ExecutorState::Cancelled
        } else {
            ExecutorState::Completed
        };

        Ok(summary)
    }

    /// The sequential item loop. No two subprocesses run concurrently.
    fn run_loop(
        &self,
        snapshot: &[PathBuf],
        config: &RunConfig,
        invoker: &dyn ProcessInvoker,
        sink: &dyn EventSink,
    ) -> RunSummary {
        let total = snapshot.len();
        let mut summary = RunSummary::default();

        for (index, input) in snapshot.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::info!("Run cancelled at item {}/{}", index + 1, total);
                sink.emit(RunnerEvent::Log(
                    "[WARNING] Processing cancelled by user".to_string(),
                ));
                summary.cancelled = true;
                break;
            }

            let filename = display_name(input);
            let output = config.output_path_for(input);

            sink.emit(RunnerEvent::Progress {
                current: index,
                total,
                message: format!("Processing: {}", filename),
            });
            sink.emit(RunnerEvent::Log(format!(
                "Processing: {} -> {}",
                input.display(),
                output.display()
            )));

            let outcome = self.process_item(invoker, input, &output, sink);

            let success = outcome.is_success();
            if success {
                summary.successful += 1;
            } else {
                summary.failed += 1;
                sink.emit(RunnerEvent::Log(format!("[ERROR] {}", outcome.message())));
            }

            sink.emit(RunnerEvent::ItemComplete {
                filename,
                success,
                message: outcome.message(),
            });

            summary.outcomes.push(ItemReport {
                input: input.clone(),
                output,
                outcome,
            });
        }

        sink.emit(RunnerEvent::Progress {
            current: total,
            total,
            message: "Complete".to_string(),
        });
        sink.emit(RunnerEvent::RunComplete {
            successful: summary.successful,
            failed: summary.failed,
        });

        tracing::info!(
            "Run finished: {} successful, {} failed, cancelled={}",
            summary.successful,
            summary.failed,
            summary.cancelled
        );
        summary
    }

    /// Invoke the script on one item and classify the result.
    fn process_item(
        &self,
        invoker: &dyn ProcessInvoker,
        input: &Path,
        output: &Path,
        sink: &dyn EventSink,
    ) -> JobOutcome {
        match invoker.invoke(input, output) {
            Ok(out) => {
                emit_tool_output(sink, &out.stdout, false);
                emit_tool_output(sink, &out.stderr, true);

                match out.status {
                    ProcessStatus::Exited(0) => JobOutcome::Success,
                    ProcessStatus::Exited(_) => {
                        let stderr = out.stderr.trim_end();
                        let reason = if stderr.is_empty() {
                            "Unknown error".to_string()
                        } else {
                            stderr.to_string()
                        };
                        JobOutcome::Failure(reason)
                    }
                    ProcessStatus::TimedOut => JobOutcome::TimedOut,
                }
            }
            Err(e) => JobOutcome::Failure(e.to_string()),
        }
    }
}

/// Stream captured subprocess output line by line.
fn emit_tool_output(sink: &dyn EventSink, text: &str, is_stderr: bool) {
    for line in text.lines() {
        sink.emit(RunnerEvent::ToolOutput {
            line: line.to_string(),
            is_stderr,
        });
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// File name portion of a path for display.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::process::ProcessOutput;
    use std::fs::File;
    use std::io;
    use std::sync::mpsc;
    use tempfile::TempDir;

    /// Scripted invoker: returns the next canned result per call.
    struct MockInvoker {
        results: Mutex<Vec<io::Result<ProcessOutput>>>,
        calls: AtomicBool,
        call_count: Mutex<usize>,
        cancel_after: Option<(usize, CancelHandle)>,
    }

    impl MockInvoker {
        fn new(results: Vec<io::Result<ProcessOutput>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: AtomicBool::new(false),
                call_count: Mutex::new(0),
                cancel_after: None,
            }
        }

        /// Cancel via the handle once `n` invocations have completed.
        fn cancel_after(mut self, n: usize, handle: CancelHandle) -> Self {
            self.cancel_after = Some((n, handle));
            self
        }

        fn invoked(&self) -> bool {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ProcessInvoker for MockInvoker {
        fn invoke(&self, _input: &Path, _output: &Path) -> io::Result<ProcessOutput> {
            self.calls.store(true, Ordering::SeqCst);
            let result = self.results.lock().remove(0);

            let mut count = self.call_count.lock();
            *count += 1;
            if let Some((n, handle)) = &self.cancel_after {
                if *count == *n {
                    handle.cancel();
                }
            }
            result
        }
    }

    fn exited(code: i32, stdout: &str, stderr: &str) -> io::Result<ProcessOutput> {
        Ok(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            status: ProcessStatus::Exited(code),
        })
    }

    fn timed_out() -> io::Result<ProcessOutput> {
        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            status: ProcessStatus::TimedOut,
        })
    }

    /// RunConfig whose script actually exists (validation requires it).
    fn test_config(dir: &TempDir, output_dir: Option<PathBuf>) -> RunConfig {
        let script = dir.path().join("process_audio.sh");
        File::create(&script).unwrap();
        RunConfig::new(script, output_dir)
    }

    fn collect_events(rx: mpsc::Receiver<RunnerEvent>) -> Vec<RunnerEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn empty_batch_completes_without_invoking() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(Vec::new());
        let invoked_probe = Arc::new(invoker);

        let executor = BatchExecutor::with_invoker(Box::new(ArcInvoker(invoked_probe.clone())));
        let (tx, rx) = mpsc::channel();

        let summary = executor
            .run(&[], &test_config(&dir, None), &tx)
            .unwrap();

        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.outcomes.is_empty());
        assert!(!invoked_probe.invoked());
        assert_eq!(executor.state(), ExecutorState::Completed);

        let events = collect_events(rx);
        assert_eq!(
            events,
            vec![
                RunnerEvent::Progress {
                    current: 0,
                    total: 0,
                    message: "Complete".to_string()
                },
                RunnerEvent::RunComplete {
                    successful: 0,
                    failed: 0
                },
            ]
        );
    }

    /// Shared-ownership wrapper so tests can keep probing the mock.
    struct ArcInvoker(Arc<MockInvoker>);

    impl ProcessInvoker for ArcInvoker {
        fn invoke(&self, input: &Path, output: &Path) -> io::Result<ProcessOutput> {
            self.0.invoke(input, output)
        }
    }

    #[test]
    fn success_reports_output_beside_input() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![exited(0, "cleaned\n", "")]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, rx) = mpsc::channel();

        let summary = executor
            .run(
                &[PathBuf::from("/music/a.wav")],
                &test_config(&dir, None),
                &tx,
            )
            .unwrap();

        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.outcomes[0].outcome, JobOutcome::Success);
        assert_eq!(
            summary.outcomes[0].output,
            PathBuf::from("/music/a_processed.mp3")
        );

        let events = collect_events(rx);
        assert!(events.contains(&RunnerEvent::ItemComplete {
            filename: "a.wav".to_string(),
            success: true,
            message: "Success".to_string(),
        }));
        // Script stdout is streamed as tool output
        assert!(events.contains(&RunnerEvent::ToolOutput {
            line: "cleaned".to_string(),
            is_stderr: false,
        }));
    }

    #[test]
    fn nonzero_exit_reports_stderr() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![exited(1, "", "bad codec\n")]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, rx) = mpsc::channel();

        let summary = executor
            .run(
                &[PathBuf::from("/music/b.mp3")],
                &test_config(&dir, None),
                &tx,
            )
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.outcomes[0].outcome,
            JobOutcome::Failure("bad codec".to_string())
        );

        // Stderr is also streamed line by line for the tail buffer
        let events = collect_events(rx);
        assert!(events.contains(&RunnerEvent::ToolOutput {
            line: "bad codec".to_string(),
            is_stderr: true,
        }));
    }

    #[test]
    fn empty_stderr_becomes_unknown_error() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![exited(3, "", "")]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, _rx) = mpsc::channel();

        let summary = executor
            .run(
                &[PathBuf::from("/music/b.mp3")],
                &test_config(&dir, None),
                &tx,
            )
            .unwrap();

        assert_eq!(
            summary.outcomes[0].outcome,
            JobOutcome::Failure("Unknown error".to_string())
        );
    }

    #[test]
    fn timeout_is_classified_as_timed_out() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![timed_out()]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, _rx) = mpsc::channel();

        let summary = executor
            .run(
                &[PathBuf::from("/music/c.ogg")],
                &test_config(&dir, None),
                &tx,
            )
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.outcomes[0].outcome, JobOutcome::TimedOut);
    }

    #[test]
    fn invocation_fault_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        ))]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, _rx) = mpsc::channel();

        let summary = executor
            .run(
                &[PathBuf::from("/music/d.m4a")],
                &test_config(&dir, None),
                &tx,
            )
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(matches!(
            &summary.outcomes[0].outcome,
            JobOutcome::Failure(reason) if reason.contains("permission denied")
        ));
    }

    #[test]
    fn failures_do_not_abort_the_batch() {
        let dir = TempDir::new().unwrap();
        let invoker = MockInvoker::new(vec![
            exited(1, "", "broken\n"),
            exited(0, "", ""),
            timed_out(),
            exited(0, "", ""),
        ]);
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, _rx) = mpsc::channel();

        let inputs: Vec<PathBuf> = (1..=4)
            .map(|i| PathBuf::from(format!("/music/{}.wav", i)))
            .collect();

        let summary = executor
            .run(&inputs, &test_config(&dir, None), &tx)
            .unwrap();

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.outcomes.len(), 4);
        assert!(!summary.cancelled);
    }

    #[test]
    fn cancellation_stops_before_next_item() {
        let dir = TempDir::new().unwrap();
        let mut executor = BatchExecutor::new();

        // Cancelled after item 2 completes; items 3..5 never attempted
        let invoker = MockInvoker::new(vec![exited(0, "", ""), exited(0, "", "")])
            .cancel_after(2, executor.cancel_handle());
        executor.invoker = Some(Box::new(invoker));
        let (tx, rx) = mpsc::channel();

        let inputs: Vec<PathBuf> = (1..=5)
            .map(|i| PathBuf::from(format!("/music/{}.wav", i)))
            .collect();

        let summary = executor
            .run(&inputs, &test_config(&dir, None), &tx)
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.successful + summary.failed, 2);
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(executor.state(), ExecutorState::Cancelled);

        let events = collect_events(rx);
        // Final progress still lands at (total, total)
        assert!(events.contains(&RunnerEvent::Progress {
            current: 5,
            total: 5,
            message: "Complete".to_string(),
        }));
        assert!(events.contains(&RunnerEvent::Log(
            "[WARNING] Processing cancelled by user".to_string()
        )));
    }

    #[test]
    fn second_concurrent_run_is_rejected() {
        use std::sync::mpsc::sync_channel;
        use std::thread;

        /// Invoker that blocks until released, to hold a run open.
        struct BlockingInvoker(Mutex<mpsc::Receiver<()>>);

        impl ProcessInvoker for BlockingInvoker {
            fn invoke(&self, _input: &Path, _output: &Path) -> io::Result<ProcessOutput> {
                let _ = self.0.lock().recv();
                Ok(ProcessOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    status: ProcessStatus::Exited(0),
                })
            }
        }

        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, None);

        let (release_tx, release_rx) = mpsc::channel();
        let (started_tx, started_rx) = sync_channel(0);

        let executor = Arc::new(BatchExecutor::with_invoker(Box::new(BlockingInvoker(
            Mutex::new(release_rx),
        ))));

        let worker_exec = Arc::clone(&executor);
        let worker_config = config.clone();
        let worker = thread::spawn(move || {
            let (tx, _rx) = mpsc::channel();
            started_tx.send(()).unwrap();
            worker_exec
                .run(&[PathBuf::from("/music/a.wav")], &worker_config, &tx)
                .unwrap()
        });

        started_rx.recv().unwrap();
        // Give the worker a moment to take the Running state
        while !executor.is_running() {
            thread::yield_now();
        }

        let (tx, _rx) = mpsc::channel();
        let second = executor.run(&[PathBuf::from("/music/b.wav")], &config, &tx);
        assert!(matches!(second, Err(RunnerError::AlreadyRunning)));

        release_tx.send(()).unwrap();
        let summary = worker.join().unwrap();
        assert_eq!(summary.successful, 1);
    }

    #[test]
    fn validation_failure_blocks_the_run() {
        let invoker = MockInvoker::new(Vec::new());
        let executor = BatchExecutor::with_invoker(Box::new(invoker));
        let (tx, _rx) = mpsc::channel();

        let config = RunConfig::new("/nonexistent/process_audio.sh", None);
        let result = executor.run(&[PathBuf::from("/music/a.wav")], &config, &tx);

        assert!(matches!(
            result,
            Err(RunnerError::Validation(ValidationError::ScriptNotFound(_)))
        ));
        assert_eq!(executor.state(), ExecutorState::Idle);
    }
}
