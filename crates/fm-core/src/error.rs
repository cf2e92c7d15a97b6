//! Error types for fm-core

use thiserror::Error;

/// Core error type for Fieldmove
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Invalid configuration value
    #[error("[E002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E003: Backup marker could not be found
    #[error("[E003] Backup marker not found: {path}")]
    BackupNotFound { path: String },

    /// E004: Backup marker belongs to a different migration
    #[error("[E004] Backup marker {path} belongs to migration '{found}', expected '{expected}'")]
    BackupMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// E005: Persisted run state does not match the plan being executed
    #[error("[E005] Run state at {path} was recorded for a different plan")]
    RunStateMismatch { path: String },

    /// E006: IO error
    #[error("[E006] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E007: IO error with file path context
    #[error("[E007] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E008: YAML parse error
    #[error("[E008] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// E009: JSON serialization/deserialization error
    #[error("[E009] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an IO error with the path it occurred on
    pub fn io_with_path(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
