//! Worker-to-invoker event stream.
//!
//! The executor never touches invoker-owned state; everything it has to
//! say goes through an [`EventSink`]. Emission order is preserved by the
//! sink implementations (mpsc channel or direct callback) and emitting
//! never blocks the worker on the invoker's consumption speed.

use std::sync::mpsc::Sender;

/// An event emitted by the batch executor during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// Emitted before each item is processed, and once more at
    /// `(total, total)` when the run reaches a terminal state.
    Progress {
        /// Zero-based index of the item about to be processed.
        current: usize,
        /// Total items in the snapshot.
        total: usize,
        /// Human-readable status line.
        message: String,
    },
    /// Emitted after each item completes.
    ItemComplete {
        /// Input file name (no directory).
        filename: String,
        /// Whether the item succeeded.
        success: bool,
        /// "Success" or the failure diagnostic.
        message: String,
    },
    /// A notice line for the run log stream.
    Log(String),
    /// One line of captured subprocess output.
    ///
    /// Kept separate from [`RunnerEvent::Log`] so front-ends can route
    /// raw tool chatter through the run logger's tail buffer instead of
    /// the live stream.
    ToolOutput {
        /// The output line, without the trailing newline.
        line: String,
        /// True if the line came from the subprocess's stderr.
        is_stderr: bool,
    },
    /// Aggregate completion, counts over attempted items only.
    RunComplete { successful: usize, failed: usize },
}

/// Destination for runner events.
pub trait EventSink: Send {
    /// Deliver one event. Must not block on the consumer.
    fn emit(&self, event: RunnerEvent);
}

/// A channel sender is the usual sink: the worker thread sends, the
/// invoking context receives in order.
impl EventSink for Sender<RunnerEvent> {
    fn emit(&self, event: RunnerEvent) {
        // A disconnected receiver just means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Callback-based sink for front-ends that dispatch onto their own
/// execution context.
pub struct CallbackSink(Box<dyn Fn(RunnerEvent) + Send + Sync>);

impl CallbackSink {
    /// Wrap a callback as a sink.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(RunnerEvent) + Send + Sync + 'static,
    {
        Self(Box::new(callback))
    }
}

impl EventSink for CallbackSink {
    fn emit(&self, event: RunnerEvent) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn channel_sink_preserves_order() {
        let (tx, rx) = mpsc::channel();

        tx.emit(RunnerEvent::Log("first".into()));
        tx.emit(RunnerEvent::Log("second".into()));
        drop(tx);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                RunnerEvent::Log("first".into()),
                RunnerEvent::Log("second".into()),
            ]
        );
    }

    #[test]
    fn channel_sink_ignores_disconnected_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);

        // Must not panic
        tx.emit(RunnerEvent::Log("dropped".into()));
    }

    #[test]
    fn callback_sink_invokes_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let sink = CallbackSink::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        sink.emit(RunnerEvent::Log("one".into()));
        sink.emit(RunnerEvent::Log("two".into()));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
