//! Typed engine events and structured log entries

use chrono::{DateTime, SecondsFormat, Utc};
use fm_core::MigrationId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One line of the engine's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_id: Option<MigrationId>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, migration_id: Option<MigrationId>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            migration_id,
        }
    }

    /// `[LEVEL] <ISO timestamp> - <message>`
    pub fn line(&self) -> String {
        format!(
            "[{}] {} - {}",
            self.level,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.message
        )
    }
}

/// Counters reported when a migration completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    pub id: MigrationId,
    pub processed: u64,
    pub failed: u64,
    pub duplicates: u64,
    /// processed / total, 0 when nothing was submitted
    pub success_rate: f64,
    pub duration: Duration,
}

/// Everything the engine announces to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    Started {
        id: MigrationId,
        backup_file: Option<PathBuf>,
    },
    BatchProcessed {
        id: MigrationId,
        batch_size: usize,
        success_count: usize,
        failure_count: usize,
        duplicate_count: usize,
    },
    Completed(CompletionSummary),
    Cancelled {
        id: MigrationId,
    },
    RolledBack {
        id: MigrationId,
        backup_file: PathBuf,
    },
    Log(LogEntry),
}
