//! Backup markers for migration runs
//!
//! A backup marker is a small JSON checkpoint written before any data moves.
//! It records which run it belongs to, when it was taken, and the run status
//! at that moment. It does not contain table contents: rolling back to a
//! marker means returning to a tracked checkpoint, not restoring data.

use crate::error::{CoreError, CoreResult};
use crate::identifiers::MigrationId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Lifecycle status of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    InProgress,
    Completed,
    Cancelled,
    RolledBack,
}

impl MigrationStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(self) -> bool {
        !matches!(self, MigrationStatus::InProgress)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::InProgress => write!(f, "in-progress"),
            MigrationStatus::Completed => write!(f, "completed"),
            MigrationStatus::Cancelled => write!(f, "cancelled"),
            MigrationStatus::RolledBack => write!(f, "rolled-back"),
        }
    }
}

/// Persisted checkpoint for one migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMarker {
    pub migration_id: MigrationId,
    pub timestamp: DateTime<Utc>,
    pub status: MigrationStatus,
}

impl BackupMarker {
    pub fn new(migration_id: MigrationId, status: MigrationStatus) -> Self {
        Self {
            migration_id,
            timestamp: Utc::now(),
            status,
        }
    }

    /// File name of the marker: `backup-<id>-<timestamp>.json`, with the
    /// timestamp's `:` and `.` replaced so it is safe on every filesystem.
    pub fn file_name(&self) -> String {
        let stamp = self
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        format!("backup-{}-{}.json", self.migration_id, stamp)
    }

    /// Write the marker into `dir`, returning the path written.
    ///
    /// Uses write-to-temp-then-rename so a crash never leaves a torn marker.
    pub fn write(&self, dir: &Path) -> CoreResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| CoreError::io_with_path(dir, e))?;

        let path = dir.join(self.file_name());
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json).map_err(|e| CoreError::io_with_path(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| CoreError::io_with_path(&path, e))?;

        log::debug!("Wrote backup marker {}", path.display());
        Ok(path)
    }

    /// Read and parse a marker
    pub fn read(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::BackupNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| CoreError::io_with_path(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read a marker and check it was written for `expected`
    pub fn read_for(path: &Path, expected: &MigrationId) -> CoreResult<Self> {
        let marker = Self::read(path)?;
        if &marker.migration_id != expected {
            return Err(CoreError::BackupMismatch {
                path: path.display().to_string(),
                expected: expected.to_string(),
                found: marker.migration_id.to_string(),
            });
        }
        Ok(marker)
    }

    /// Delete a marker file; a marker that is already gone is not an error
    pub fn remove(path: &Path) -> CoreResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::io_with_path(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> MigrationId {
        MigrationId::try_new(s).unwrap()
    }

    #[test]
    fn test_file_name_has_no_colons_or_periods_in_timestamp() {
        let marker = BackupMarker::new(id("mig-1"), MigrationStatus::InProgress);
        let name = marker.file_name();
        assert!(name.starts_with("backup-mig-1-"));
        assert!(name.ends_with(".json"));
        let stem = name.trim_end_matches(".json");
        assert!(!stem.contains(':'));
        assert!(!stem.contains('.'));
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let marker = BackupMarker::new(id("mig-2"), MigrationStatus::InProgress);
        let path = marker.write(&dir.path().join("backups")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"migrationId\""));
        assert!(raw.contains("\"in-progress\""));

        let back = BackupMarker::read_for(&path, &id("mig-2")).unwrap();
        assert_eq!(back, marker);
    }

    #[test]
    fn test_read_missing_marker() {
        let dir = TempDir::new().unwrap();
        let err = BackupMarker::read(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CoreError::BackupNotFound { .. }));
    }

    #[test]
    fn test_read_for_rejects_other_migration() {
        let dir = TempDir::new().unwrap();
        let path = BackupMarker::new(id("mig-a"), MigrationStatus::InProgress)
            .write(dir.path())
            .unwrap();
        let err = BackupMarker::read_for(&path, &id("mig-b")).unwrap_err();
        assert!(matches!(err, CoreError::BackupMismatch { .. }));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = BackupMarker::new(id("mig-r"), MigrationStatus::Completed)
            .write(dir.path())
            .unwrap();
        BackupMarker::remove(&path).unwrap();
        assert!(!path.exists());
        BackupMarker::remove(&path).unwrap();
    }

    #[test]
    fn test_terminal_states() {
        assert!(!MigrationStatus::InProgress.is_terminal());
        assert!(MigrationStatus::Completed.is_terminal());
        assert!(MigrationStatus::Cancelled.is_terminal());
        assert!(MigrationStatus::RolledBack.is_terminal());
    }
}
