//! Data directory resolution
//!
//! Commands read content from, in order of preference:
//! 1. `--data-dir`
//! 2. `RULESET_DATA_DIR` (from the environment or `.env`)
//! 3. the platform data directory

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Environment variable naming the content data directory.
pub const DATA_DIR_ENV: &str = "RULESET_DATA_DIR";

/// Get the platform-specific data directory for ruleset content
///
/// Follows platform conventions:
/// - macOS: `~/Library/Application Support/ruleset`
/// - Linux: `~/.local/share/ruleset` (or `$XDG_DATA_HOME/ruleset`)
/// - Windows: `%APPDATA%\ruleset`
/// - Fallback: `./data`
pub fn platform_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ruleset")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Resolve the content directory for a command.
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => platform_data_dir(),
        },
    };

    if !dir.is_dir() {
        anyhow::bail!(
            "Data directory does not exist: {}\n\
             Hint: pass --data-dir or set {} (e.g. crates/ruleset/content/data)",
            dir.display(),
            DATA_DIR_ENV
        );
    }

    tracing::debug!(data_dir = %dir.display(), "resolved data directory");
    Ok(dir)
}
