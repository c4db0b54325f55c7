//! Per-run logging with file and callback output.

pub mod run_logger;
pub mod types;

pub use run_logger::RunLogger;
pub use types::{LogConfig, MessagePrefix, UiLogCallback};
