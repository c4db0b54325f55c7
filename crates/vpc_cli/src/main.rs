//! Voice Prompt Cleanup - headless batch front-end
//!
//! Plays the invoker role over the core batch runner: collects input
//! files, resolves settings and the processing script, starts the run
//! on a worker thread, and consumes the event stream.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vpc_core::config::{ConfigManager, ConfigSection};
use vpc_core::jobs::{expand_paths, JobQueue, SUPPORTED_EXTENSIONS};
use vpc_core::logging::{LogConfig, RunLogger, UiLogCallback};
use vpc_core::runner::{RunConfig, RunnerEvent};

mod script;
mod worker;

/// Batch-process audio files through the external cleanup script.
#[derive(Parser, Debug)]
#[command(name = "voice-prompt-cleanup", version, about)]
struct Cli {
    /// Input files, or folders to scan for supported files.
    inputs: Vec<PathBuf>,

    /// Write processed files into this folder instead of beside each input.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Path to the processing script (overrides settings and discovery).
    #[arg(long)]
    script: Option<PathBuf>,

    /// Config file path (default: the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the supported input extensions and exit.
    #[arg(long)]
    list_extensions: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if cli.list_extensions {
        println!("{}", SUPPORTED_EXTENSIONS.join(" "));
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = cli
        .config
        .or_else(ConfigManager::default_path)
        .unwrap_or_else(|| PathBuf::from("settings.toml"));

    let mut config_manager = ConfigManager::new(&config_path);
    if let Err(e) = config_manager.load_or_create() {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
    }

    // Expand files/folders; zero matches is informational, not an error
    let files = expand_paths(&cli.inputs)?;
    if files.is_empty() {
        println!("No supported audio files found.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut queue = JobQueue::new();
    queue.add(files.clone())?;
    println!("{} file(s) ready for processing", queue.len());

    remember_session_paths(&mut config_manager, &files, cli.output_dir.as_deref());

    let output_dir = resolve_output_dir(&config_manager, cli.output_dir);
    let script_path = match resolve_script(&config_manager, cli.script) {
        Some(path) => path,
        None => {
            eprintln!(
                "Processing script not found. Install process_audio.sh or pass --script."
            );
            return Ok(ExitCode::from(2));
        }
    };

    let timeout = Duration::from_secs(config_manager.settings().processing.timeout_secs);
    let run_config = RunConfig::new(script_path, output_dir).with_timeout(timeout);
    if let Err(e) = run_config.validate() {
        eprintln!("Error: {}", e);
        return Ok(ExitCode::from(2));
    }

    if let Err(e) = config_manager.ensure_dirs_exist() {
        eprintln!("Warning: Failed to create directories: {}", e);
    }

    let to_stdout: UiLogCallback = Box::new(|line| println!("{}", line));
    let logger = RunLogger::new(
        config_manager.logs_folder(),
        LogConfig::from(&config_manager.settings().logging),
        Some(to_stdout),
    )?;

    // The queue stays locked for the whole run; the worker consumes a
    // snapshot, never the queue itself
    queue.lock();
    let snapshot = queue.snapshot();
    let total = snapshot.len();

    logger.phase(&format!("Processing {} file(s)", total));
    let handle = worker::start_run(snapshot, run_config);

    // First Ctrl-C requests a cooperative stop at the next item boundary
    let cancel = handle.cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        tracing::warn!("Failed to install interrupt handler: {}", e);
    }

    for event in &handle.events {
        handle_event(&logger, event);
    }

    let summary = handle.join()?;
    queue.unlock();
    logger.info(&format!("Run log: {}", logger.log_path().display()));

    if summary.cancelled {
        logger.warn("Run was cancelled before completing all items");
    }
    if summary.failed > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

/// Route one runner event into the run logger.
///
/// Notices go to the live stream; raw subprocess output goes through the
/// tail buffer (withheld from the stream in compact mode) and is replayed
/// when an item fails. The tail is cleared between items.
fn handle_event(logger: &RunLogger, event: RunnerEvent) {
    match event {
        RunnerEvent::Progress { current, total, message } => {
            logger.info(&format!("({}/{}) {}", (current + 1).min(total), total, message));
        }
        RunnerEvent::Log(line) => {
            logger.info(&line);
        }
        RunnerEvent::ToolOutput { line, is_stderr } => {
            logger.output_line(&line, is_stderr);
        }
        RunnerEvent::ItemComplete { filename, success, message } => {
            if success {
                logger.success(&format!("{}: {}", filename, message));
            } else {
                logger.error(&format!("{}: {}", filename, message));
                logger.show_tail(&filename);
            }
            logger.clear_tail();
        }
        RunnerEvent::RunComplete { successful, failed } => {
            logger.phase("Processing complete");
            logger.info(&format!("  Successful: {}", successful));
            logger.info(&format!("  Failed: {}", failed));
        }
    }
}

/// Persist the browse/output folders the way the GUI settings panel did.
fn remember_session_paths(
    config_manager: &mut ConfigManager,
    files: &[PathBuf],
    output_dir: Option<&std::path::Path>,
) {
    let paths = &mut config_manager.settings_mut().paths;

    if let Some(parent) = files.first().and_then(|f| f.parent()) {
        paths.last_input_folder = parent.to_string_lossy().into_owned();
    }
    if let Some(dir) = output_dir {
        paths.output_folder = dir.to_string_lossy().into_owned();
        paths.use_custom_output = true;
    }

    if let Err(e) = config_manager.update_section(ConfigSection::Paths) {
        tracing::warn!("Failed to persist path settings: {}", e);
    }
}

/// Output directory: CLI flag first, then the persisted custom folder.
fn resolve_output_dir(config_manager: &ConfigManager, flag: Option<PathBuf>) -> Option<PathBuf> {
    if flag.is_some() {
        return flag;
    }

    let paths = &config_manager.settings().paths;
    if paths.use_custom_output && !paths.output_folder.is_empty() {
        Some(PathBuf::from(&paths.output_folder))
    } else {
        None
    }
}

/// Script path: CLI flag, then settings, then install-location discovery.
fn resolve_script(config_manager: &ConfigManager, flag: Option<PathBuf>) -> Option<PathBuf> {
    if flag.is_some() {
        return flag;
    }

    let configured = &config_manager.settings().processing.script_path;
    if !configured.is_empty() {
        return Some(PathBuf::from(configured));
    }

    script::discover_script()
}
