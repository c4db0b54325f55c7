//! VPC Core - Backend logic for Voice Prompt Cleanup
//!
//! This crate contains all business logic with zero UI dependencies:
//! the job queue, file discovery, the batch executor that drives the
//! external processing script, run logging, and settings persistence.
//! It can be used by the CLI front-end or a GUI shell.

pub mod config;
pub mod jobs;
pub mod logging;
pub mod runner;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
