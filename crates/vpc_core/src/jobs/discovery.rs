//! Input file discovery.
//!
//! Expands user-supplied paths (files or folders) into the list of
//! processable inputs using a fixed extension allow-list. Finding zero
//! files is an informational no-op, not an error.

use std::io;
use std::path::{Path, PathBuf};

/// Supported audio/video container extensions (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "m4a", "aac", "wma", "opus", "webm", "mp4", "mkv", "avi", "mov",
];

/// Check whether a path has a supported extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Expand a set of user-supplied paths into processable input files.
///
/// Supported files are kept as-is. Directories are scanned one level deep
/// for supported files (sorted for a stable queue order). Unsupported
/// files and anything else are skipped. An empty result is valid.
pub fn expand_paths(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported(path) {
                files.push(path.clone());
            } else {
                tracing::debug!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            files.extend(scan_folder(path)?);
        } else {
            tracing::warn!("Input path not found: {}", path.display());
        }
    }

    tracing::info!("Discovered {} input file(s)", files.len());
    Ok(files)
}

/// Scan a folder (non-recursively) for supported files.
fn scan_folder(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_supported(&path) {
            found.push(path);
        }
    }

    // Directory iteration order is platform-dependent
    found.sort();
    Ok(found)
}
