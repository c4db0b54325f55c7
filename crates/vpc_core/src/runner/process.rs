//! Low-level processing-script invocation.
//!
//! The script is a black-box collaborator: `<script> <input> <output>`,
//! exit 0 = success, diagnostics on stderr, bounded by a hard timeout.
//! The [`ProcessInvoker`] trait is the seam the executor is tested
//! through.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Hard per-invocation timeout (10 minutes).
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(600);

/// Poll interval while waiting for the child to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How the invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The process exited on its own with this code.
    Exited(i32),
    /// The process outlived the timeout and was killed.
    TimedOut,
}

/// Captured output of one invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit classification.
    pub status: ProcessStatus,
}

impl ProcessOutput {
    /// Whether the process exited successfully.
    pub fn success(&self) -> bool {
        self.status == ProcessStatus::Exited(0)
    }
}

/// Seam for invoking the external processing tool on one item.
pub trait ProcessInvoker: Send + Sync {
    /// Invoke the tool with the resolved input and output paths.
    ///
    /// `Err` means the invocation itself faulted (spawn failure, broken
    /// pipe); timeouts and non-zero exits are reported in the output.
    fn invoke(&self, input: &Path, output: &Path) -> io::Result<ProcessOutput>;
}

/// Production invoker: runs the processing script as a subprocess.
pub struct ScriptInvoker {
    /// Path to the processing script.
    script: PathBuf,
    /// Per-invocation timeout.
    timeout: Duration,
}

impl ScriptInvoker {
    /// Create an invoker for the given script with the standard timeout.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            timeout: PROCESS_TIMEOUT,
        }
    }

    /// Override the timeout (used by tests; production keeps the default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The script this invoker runs.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Wait for the child to exit, bounded by the timeout.
    ///
    /// On timeout the child is killed and reaped before returning.
    fn wait_with_timeout(&self, child: &mut Child) -> io::Result<ProcessStatus> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(ProcessStatus::Exited(status.code().unwrap_or(-1)));
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(ProcessStatus::TimedOut);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

impl ProcessInvoker for ScriptInvoker {
    fn invoke(&self, input: &Path, output: &Path) -> io::Result<ProcessOutput> {
        tracing::debug!(
            "Running: {} {} {}",
            self.script.display(),
            input.display(),
            output.display()
        );

        let mut child = Command::new(&self.script)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes off-thread so a chatty script can't fill a
        // pipe buffer and deadlock against our wait loop.
        let stdout_reader = child.stdout.take().map(drain_to_string);
        let stderr_reader = child.stderr.take().map(drain_to_string);

        let status = self.wait_with_timeout(&mut child)?;

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        Ok(ProcessOutput {
            stdout,
            stderr,
            status,
        })
    }
}

/// Read a pipe to completion on a background thread.
fn drain_to_string<R>(mut reader: R) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Collect a reader thread's result; empty string if it panicked.
fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script into `dir`.
    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn captures_stdout_on_success() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "ok.sh", "echo \"processed $1 -> $2\"\nexit 0");

        let invoker = ScriptInvoker::new(&script);
        let out = invoker
            .invoke(Path::new("/in/a.wav"), Path::new("/out/a_processed.mp3"))
            .unwrap();

        assert!(out.success());
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert!(out.stdout.contains("processed /in/a.wav"));
    }

    #[test]
    fn captures_stderr_on_failure() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "fail.sh", "echo 'bad codec' >&2\nexit 1");

        let invoker = ScriptInvoker::new(&script);
        let out = invoker
            .invoke(Path::new("/in/b.mp3"), Path::new("/out/b_processed.mp3"))
            .unwrap();

        assert!(!out.success());
        assert_eq!(out.status, ProcessStatus::Exited(1));
        assert!(out.stderr.contains("bad codec"));
    }

    #[test]
    fn kills_child_on_timeout() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "slow.sh", "sleep 30\nexit 0");

        let invoker = ScriptInvoker::new(&script).with_timeout(Duration::from_millis(250));
        let started = Instant::now();
        let out = invoker
            .invoke(Path::new("/in/c.ogg"), Path::new("/out/c_processed.mp3"))
            .unwrap();

        assert_eq!(out.status, ProcessStatus::TimedOut);
        // Must come back promptly, not after the child's sleep
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn spawn_failure_is_an_invocation_fault() {
        let invoker = ScriptInvoker::new("/nonexistent/process_audio.sh");
        let result = invoker.invoke(Path::new("/in/a.wav"), Path::new("/out/a.mp3"));
        assert!(result.is_err());
    }
}
