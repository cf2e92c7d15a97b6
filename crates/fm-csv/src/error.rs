//! Error types for fm-csv

use std::path::Path;
use thiserror::Error;

/// Flat-file adapter errors
#[derive(Error, Debug)]
pub enum CsvError {
    /// File not found (C001)
    #[error("[C001] File not found: {path}")]
    FileNotFound { path: String },

    /// Malformed structure (C002)
    #[error("[C002] Parse error in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: u64,
        message: String,
    },

    /// Unknown text encoding label (C003)
    #[error("[C003] Unsupported text encoding: {label}")]
    UnsupportedEncoding { label: String },

    /// IO error with file path context (C004)
    #[error("[C004] Failed to access '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Failure writing delimited output (C005)
    #[error("[C005] Failed to write '{path}': {message}")]
    Write { path: String, message: String },
}

impl CsvError {
    pub(crate) fn parse(path: &Path, line: u64, message: impl Into<String>) -> Self {
        CsvError::Parse {
            path: path.display().to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CsvError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Classify an error raised by the csv reader
    pub(crate) fn from_csv(path: &Path, err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(source) => CsvError::io(path, source),
            other => CsvError::parse(path, line, format!("{:?}", other)),
        }
    }
}

/// Result type alias for CsvError
pub type CsvResult<T> = Result<T, CsvError>;
