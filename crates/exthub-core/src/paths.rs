//! Well-known locations for config and data

use std::path::PathBuf;

const APP_DIR: &str = "exthub";

/// `~/.config/exthub` (or the platform equivalent)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `~/.local/share/exthub` (or the platform equivalent)
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where platform hosts keep installed extension packages
pub fn extensions_dir() -> PathBuf {
    data_dir().join("extensions")
}

/// Key-value file backing persisted UI state (disabled extensions etc.)
pub fn storage_file() -> PathBuf {
    data_dir().join("storage.json")
}
