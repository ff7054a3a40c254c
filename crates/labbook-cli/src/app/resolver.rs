//! Path resolution for the config file and the notebook data directory.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{default_config_path, default_data_dir, LabbookConfig};

/// Resolve the config file path, checking LABBOOK_CONFIG env var first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("LABBOOK_CONFIG") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Resolve the data directory: `--data-dir`/`LABBOOK_DATA_DIR`, then the
/// config file, then the XDG data directory.
pub fn resolve_data_dir(cli: &Cli, config: &LabbookConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli.data_dir.clone() {
        return Ok(path);
    }
    if let Some(path) = config
        .notebook
        .data_dir
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        return Ok(PathBuf::from(path));
    }
    default_data_dir()
}

/// Error message when no notebook exists in the data directory.
pub fn missing_notebook_message(data_dir: &Path) -> String {
    format!(
        "No notebook found at {}\n\nRun:\n  labbook init\n\nOr specify a data directory:\n  LABBOOK_DATA_DIR=/path/to/notebook labbook init",
        data_dir.display()
    )
}
