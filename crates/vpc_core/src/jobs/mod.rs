//! Job queue and input file discovery.

pub mod discovery;
pub mod queue;

pub use discovery::{expand_paths, is_supported, SUPPORTED_EXTENSIONS};
pub use queue::{JobQueue, QueueError};
