//! Batch executor and its interaction contract with the processing script.
//!
//! The executor consumes a queue snapshot, invokes the external script
//! once per item on the calling thread (the front-end runs it on a
//! dedicated worker), and reports progress through an ordered event
//! stream. Cancellation is cooperative, checked between items.

pub mod config;
pub mod events;
pub mod executor;
pub mod outcome;
pub mod process;

pub use config::{RunConfig, ValidationError};
pub use events::{CallbackSink, EventSink, RunnerEvent};
pub use executor::{BatchExecutor, CancelHandle, ExecutorState, RunnerError};
pub use outcome::{ItemReport, JobOutcome, RunSummary};
pub use process::{ProcessInvoker, ProcessOutput, ProcessStatus, ScriptInvoker, PROCESS_TIMEOUT};
