//! Processing-script discovery.
//!
//! When no explicit path is configured, the script is probed in a fixed
//! set of install locations.

use std::path::PathBuf;

const SCRIPT_NAME: &str = "process_audio.sh";

/// Find the processing script in the standard install locations.
pub fn discover_script() -> Option<PathBuf> {
    candidate_locations().into_iter().find(|path| path.is_file())
}

/// Probe order: beside the binary, system shares, then the user share.
fn candidate_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            locations.push(dir.join(SCRIPT_NAME));
        }
    }

    locations.push(PathBuf::from("/usr/share/voice-prompt-cleanup").join(SCRIPT_NAME));
    locations.push(PathBuf::from("/usr/local/share/voice-prompt-cleanup").join(SCRIPT_NAME));

    if let Some(dirs) = directories::BaseDirs::new() {
        locations.push(
            dirs.home_dir()
                .join(".local/share/voice-prompt-cleanup")
                .join(SCRIPT_NAME),
        );
    }

    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_all_name_the_script() {
        let locations = candidate_locations();
        assert!(!locations.is_empty());
        for location in locations {
            assert!(location.ends_with(SCRIPT_NAME));
        }
    }
}
