//! Per-run logger with file and callback output.
//!
//! Each batch run gets its own logger that writes to a dedicated log
//! file, forwards lines to a front-end callback, and keeps a tail
//! buffer of recent subprocess output for error diagnosis.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, MessagePrefix, UiLogCallback};

/// Logger for one batch run, with dual output (file + front-end).
pub struct RunLogger {
    /// Path to the log file.
    log_path: PathBuf,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Front-end callback for live output.
    callback: Mutex<Option<UiLogCallback>>,
    /// Logging configuration.
    config: LogConfig,
    /// Recent subprocess lines, kept for error diagnosis.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl RunLogger {
    /// Create a logger for a new run.
    ///
    /// The log file is named `run_<timestamp>.log` inside `log_dir`,
    /// which is created if missing.
    pub fn new(
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<UiLogCallback>,
    ) -> std::io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("run_{}.log", stamp));
        let file_writer = BufWriter::new(File::create(&log_path)?);

        Ok(Self {
            log_path,
            file_writer: Mutex::new(Some(file_writer)),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(100)),
        })
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.output(&self.format_message(message));
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        self.info(&MessagePrefix::Warning.format(message));
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        self.info(&MessagePrefix::Error.format(message));
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        self.info(&MessagePrefix::Success.format(message));
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.info(&MessagePrefix::Phase.format(phase_name));
    }

    /// Log a line of subprocess output.
    ///
    /// Always lands in the tail buffer; in compact mode it is withheld
    /// from the live stream.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.info(&format!("{}{}", prefix, line));
    }

    /// Show the tail buffer (typically after an item failure).
    pub fn show_tail(&self, header: &str) {
        let lines: Vec<String> = self.tail_buffer.lock().iter().cloned().collect();
        if lines.is_empty() {
            return;
        }

        self.info(&format!("[{}/tail]", header));
        for line in &lines {
            self.info(line);
        }
    }

    /// Clear the tail buffer between items.
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file handle.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Output a formatted line to file and front-end.
    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plain_config() -> LogConfig {
        LogConfig {
            compact: false,
            error_tail: 5,
            show_timestamps: false,
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger
            .log_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("run_"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), plain_config(), None).unwrap();

        logger.info("hello");
        logger.error("boom");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("hello"));
        assert!(content.contains("[ERROR] boom"));
    }

    #[test]
    fn calls_frontend_callback() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: UiLogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = RunLogger::new(dir.path(), plain_config(), Some(callback)).unwrap();
        logger.info("one");
        logger.info("two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_withholds_subprocess_output() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            error_tail: 5,
            show_timestamps: false,
        };
        let logger = RunLogger::new(dir.path(), config, None).unwrap();

        logger.output_line("raw tool chatter", false);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(!content.contains("raw tool chatter"));
        assert_eq!(logger.get_tail(), vec!["raw tool chatter".to_string()]);
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), plain_config(), None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), false);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn show_tail_replays_buffer() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), plain_config(), None).unwrap();

        logger.output_line("detail line", true);
        logger.show_tail("error");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[error/tail]"));
        assert!(content.contains("detail line"));
    }
}
