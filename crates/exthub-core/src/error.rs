//! Error types for extension operations

use std::path::PathBuf;

/// Errors surfaced by the extension service and its collaborators.
///
/// Most failures degrade to `false` or an empty collection inside the
/// service; these are the ones a caller gets to see.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("Registry request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Registry returned {status} for {url}")]
    Registry { url: String, status: u16 },

    #[error("Platform failed to {action} '{name}': {reason}")]
    Platform {
        action: &'static str,
        name: String,
        reason: String,
    },

    #[error("Failed to persist '{key}': {reason}")]
    Persistence { key: String, reason: String },

    #[error("Invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
