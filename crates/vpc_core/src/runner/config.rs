//! Run configuration and pre-run validation.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::process::PROCESS_TIMEOUT;

/// Pre-run validation failures. These block the run from starting.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The processing script does not exist.
    #[error("processing script not found: {0}")]
    ScriptNotFound(PathBuf),

    /// The output directory does not exist and could not be created.
    #[error("cannot create output folder {path}: {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the external processing script.
    pub script: PathBuf,
    /// Output directory; `None` means write beside each input file.
    pub output_dir: Option<PathBuf>,
    /// Per-file subprocess timeout.
    pub timeout: Duration,
}

impl RunConfig {
    /// Create a run configuration with the standard timeout.
    pub fn new(script: impl Into<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        Self {
            script: script.into(),
            output_dir,
            timeout: PROCESS_TIMEOUT,
        }
    }

    /// Override the per-file timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate before a run starts.
    ///
    /// The script must exist; the output directory must exist or be
    /// creatable (it is created here if missing).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.script.is_file() {
            return Err(ValidationError::ScriptNotFound(self.script.clone()));
        }

        if let Some(dir) = &self.output_dir {
            if !dir.is_dir() {
                std::fs::create_dir_all(dir).map_err(|source| {
                    ValidationError::OutputDirUnavailable {
                        path: dir.clone(),
                        source,
                    }
                })?;
            }
        }

        Ok(())
    }

    /// Resolve the output path for an input file.
    ///
    /// `<input_stem>_processed.mp3` in the configured output directory,
    /// or in the input's own directory when none is configured. No
    /// collision detection: an existing file with that name is
    /// overwritten by the external tool.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = format!("{}_processed.mp3", stem);

        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => input.parent().unwrap_or_else(|| Path::new(".")).join(name),
        }
    }
}
