//! XDG Base Directory utilities for store and config locations.

use crate::error::FsError;
use std::path::PathBuf;

const APP_DIR: &str = "sqlfs";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, FsError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        FsError::Config("Could not determine XDG config home directory (HOME not set)".to_string())
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/sqlfs/config.toml`, if a config home can be determined
pub fn global_config_path() -> Option<PathBuf> {
    config_home()
        .ok()
        .map(|home| home.join(APP_DIR).join("config.toml"))
}

/// Default store location `$XDG_DATA_HOME/sqlfs/default.db`
///
/// Creates the directory if it doesn't exist
pub fn default_store_path() -> Result<PathBuf, FsError> {
    let data_home = data_home().ok_or_else(|| {
        FsError::Config("Could not determine XDG data home directory (HOME not set)".to_string())
    })?;
    let dir = data_home.join(APP_DIR);

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            FsError::Config(format!(
                "Failed to create data directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    Ok(dir.join("default.db"))
}
