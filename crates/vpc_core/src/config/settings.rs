//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level
//! updates.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External processing settings.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// Run-log configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Custom output folder for processed files.
    #[serde(default)]
    pub output_folder: String,

    /// Write into the custom output folder instead of beside each input.
    #[serde(default)]
    pub use_custom_output: bool,

    /// Last folder the user browsed inputs from.
    #[serde(default)]
    pub last_input_folder: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    "logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            use_custom_output: false,
            last_input_folder: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External processing script configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Path to the processing script; empty means discover it.
    #[serde(default)]
    pub script_path: String,

    /// Per-file timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            script_path: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Run-log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Compact log output (subprocess chatter only in the tail buffer).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of subprocess lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,

    /// Show timestamps in the run log.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

impl From<&LoggingSettings> for crate::logging::LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            compact: settings.compact,
            error_tail: settings.error_tail,
            show_timestamps: settings.show_timestamps,
        }
    }
}

/// Identifies one settings section for section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Processing,
    Logging,
}

impl ConfigSection {
    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Processing => "processing",
            ConfigSection::Logging => "logging",
        }
    }
}
