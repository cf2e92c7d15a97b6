//! Batch execution engine
//!
//! Tracks record-level migrations from start to a terminal state. At most
//! one migration is in progress at a time; finished ones stay in the
//! registry for inspection. Every lifecycle change is published as a
//! [`MigrationEvent`] and written to the daily [`Journal`].

use crate::error::{EngineError, EngineResult};
use crate::event::{CompletionSummary, LogEntry, LogLevel, MigrationEvent};
use crate::journal::Journal;
use crate::strategy::{
    DuplicateDetector, KeyDuplicateDetector, PassthroughMigrator, RecordError, RecordMigrator,
    RequiredFieldsValidator, Validator,
};
use chrono::{DateTime, Utc};
use fm_core::{BackupMarker, MigrationId, MigrationStatus, Record};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Options for one migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Write a backup marker at start so the migration can be rolled back
    pub backup: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { backup: true }
    }
}

/// A record that could not be applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub record: Record,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// State of one tracked migration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationInstance {
    pub id: MigrationId,
    pub status: MigrationStatus,
    pub total_records: u64,
    pub processed_records: u64,
    pub failed_records: u64,
    pub duplicate_records: u64,
    pub errors: Vec<RecordFailure>,
    pub warnings: Vec<String>,
    pub backup_file: Option<PathBuf>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl MigrationInstance {
    fn new(id: MigrationId, backup_file: Option<PathBuf>) -> Self {
        Self {
            id,
            status: MigrationStatus::InProgress,
            total_records: 0,
            processed_records: 0,
            failed_records: 0,
            duplicate_records: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            backup_file,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Move to a terminal status, stamping the end time
    fn finish(&mut self, to: MigrationStatus) -> EngineResult<()> {
        if self.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.processed_records as f64 / self.total_records as f64
        }
    }

    pub fn duration(&self) -> Duration {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).to_std().unwrap_or_default()
    }
}

/// Outcome for one record of a batch, in submission order of the
/// de-duplicated records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one `process_migration_batch` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub batch_size: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub duplicate_count: usize,
    pub results: Vec<RecordResult>,
}

/// Record-level migration engine
pub struct BatchEngine {
    backup_dir: PathBuf,
    journal: Option<Journal>,
    validator: Box<dyn Validator>,
    detector: Box<dyn DuplicateDetector>,
    migrator: Box<dyn RecordMigrator>,
    record_timeout: Option<Duration>,
    instances: HashMap<MigrationId, MigrationInstance>,
    active: Option<MigrationId>,
    events: broadcast::Sender<MigrationEvent>,
}

impl BatchEngine {
    /// Engine with no validation, no de-duplication, and a pass-through
    /// record hook; backup markers go to `backup_dir`
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backup_dir: backup_dir.into(),
            journal: None,
            validator: Box::new(RequiredFieldsValidator::default()),
            detector: Box::new(KeyDuplicateDetector::default()),
            migrator: Box::new(PassthroughMigrator),
            record_timeout: None,
            instances: HashMap::new(),
            active: None,
            events,
        }
    }

    /// Also append every log entry to daily files in `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.journal = Some(Journal::new(dir));
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_duplicate_detector(mut self, detector: impl DuplicateDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_record_migrator(mut self, migrator: impl RecordMigrator + 'static) -> Self {
        self.migrator = Box::new(migrator);
        self
    }

    /// Give up on a record the hook has not applied within `timeout`; the
    /// record counts as failed and the batch moves on
    pub fn with_record_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.record_timeout = timeout;
        self
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MigrationEvent> {
        self.events.subscribe()
    }

    pub fn instance(&self, id: &MigrationId) -> Option<&MigrationInstance> {
        self.instances.get(id)
    }

    /// The in-progress migration, if any
    pub fn active_migration(&self) -> Option<&MigrationInstance> {
        self.active.as_ref().and_then(|id| self.instances.get(id))
    }

    pub fn instances(&self) -> impl Iterator<Item = &MigrationInstance> {
        self.instances.values()
    }

    /// Begin a new migration and make it the active one
    pub fn start_migration(&mut self, config: &MigrationConfig) -> EngineResult<MigrationId> {
        if let Some(active) = &self.active {
            return Err(EngineError::MigrationAlreadyActive(active.clone()));
        }

        let id = MigrationId::generate();
        let backup_file = if config.backup {
            let marker = BackupMarker::new(id.clone(), MigrationStatus::InProgress);
            Some(marker.write(&self.backup_dir)?)
        } else {
            None
        };

        self.detector.reset();
        self.instances
            .insert(id.clone(), MigrationInstance::new(id.clone(), backup_file.clone()));
        self.active = Some(id.clone());

        self.publish(MigrationEvent::Started {
            id: id.clone(),
            backup_file,
        });
        self.log(LogLevel::Info, format!("Migration {} started", id), Some(&id));
        Ok(id)
    }

    /// Validate, de-duplicate, and apply one batch of records.
    ///
    /// Validation findings are kept as warnings. Records the hook rejects
    /// are counted and kept in the instance's errors; they never abort the
    /// batch. Instance counters move with every record, so a batch that is
    /// dropped part way still accounts for the records it applied.
    pub async fn process_migration_batch(
        &mut self,
        id: &MigrationId,
        records: Vec<Record>,
    ) -> EngineResult<BatchResult> {
        if self.active.as_ref() != Some(id) {
            return Err(EngineError::InvalidMigrationId(id.to_string()));
        }

        let batch_size = records.len();
        let validation = self.validator.validate(&records);
        let dedup = self.detector.detect(records);

        let instance = self.instance_mut(id)?;
        instance.total_records += batch_size as u64;
        instance.duplicate_records += dedup.count as u64;
        instance.warnings.extend(validation.errors.iter().cloned());

        let mut results = Vec::with_capacity(dedup.unique.len());
        let mut failure_count = 0;
        for record in dedup.unique {
            match self.apply(&record).await {
                Ok(_) => {
                    self.instance_mut(id)?.processed_records += 1;
                    results.push(RecordResult {
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    // A failed record may be submitted again later
                    self.detector.forget(&record);
                    let instance = self.instance_mut(id)?;
                    instance.failed_records += 1;
                    instance.errors.push(RecordFailure {
                        record,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    failure_count += 1;
                    results.push(RecordResult {
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let result = BatchResult {
            batch_size,
            success_count: results.len() - failure_count,
            failure_count,
            duplicate_count: dedup.count,
            results,
        };

        if !validation.valid {
            self.log(
                LogLevel::Warn,
                format!("Batch has {} validation warnings", validation.errors.len()),
                Some(id),
            );
        }
        if failure_count > 0 {
            self.log(
                LogLevel::Error,
                format!("{} of {} records failed", failure_count, batch_size),
                Some(id),
            );
        }
        self.log(
            LogLevel::Info,
            format!(
                "Processed batch of {}: {} migrated, {} failed, {} duplicates",
                batch_size, result.success_count, failure_count, result.duplicate_count
            ),
            Some(id),
        );
        self.publish(MigrationEvent::BatchProcessed {
            id: id.clone(),
            batch_size,
            success_count: result.success_count,
            failure_count,
            duplicate_count: result.duplicate_count,
        });

        Ok(result)
    }

    /// Mark the migration completed and report its totals
    pub fn complete_migration(&mut self, id: &MigrationId) -> EngineResult<CompletionSummary> {
        let instance = self.finish(id, MigrationStatus::Completed)?;
        let summary = CompletionSummary {
            id: id.clone(),
            processed: instance.processed_records,
            failed: instance.failed_records,
            duplicates: instance.duplicate_records,
            success_rate: instance.success_rate(),
            duration: instance.duration(),
        };

        self.log(
            LogLevel::Info,
            format!(
                "Migration {} completed: {} processed, {} failed, {} duplicates ({:.1}% success)",
                id,
                summary.processed,
                summary.failed,
                summary.duplicates,
                summary.success_rate * 100.0
            ),
            Some(id),
        );
        self.publish(MigrationEvent::Completed(summary.clone()));
        Ok(summary)
    }

    /// Stop the migration. Records already applied stay applied.
    pub fn cancel_migration(&mut self, id: &MigrationId) -> EngineResult<()> {
        let processed = self.finish(id, MigrationStatus::Cancelled)?.processed_records;
        self.log(
            LogLevel::Warn,
            format!("Migration {} cancelled after {} records", id, processed),
            Some(id),
        );
        self.publish(MigrationEvent::Cancelled { id: id.clone() });
        Ok(())
    }

    /// Return to the checkpoint recorded at start.
    ///
    /// The backup is a marker, not a data snapshot: the marker is read back
    /// and checked, and the migration is marked rolled back.
    pub fn rollback_migration(&mut self, id: &MigrationId) -> EngineResult<()> {
        let instance = self
            .instances
            .get(id)
            .ok_or_else(|| EngineError::InvalidMigrationId(id.to_string()))?;
        if instance.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                id: id.clone(),
                from: instance.status,
                to: MigrationStatus::RolledBack,
            });
        }
        let backup_file = instance
            .backup_file
            .clone()
            .ok_or_else(|| EngineError::NoBackup(id.clone()))?;

        let marker = BackupMarker::read_for(&backup_file, id)?;
        self.finish(id, MigrationStatus::RolledBack)?;

        self.log(
            LogLevel::Warn,
            format!(
                "Migration {} rolled back to checkpoint of {}",
                id,
                marker.timestamp.to_rfc3339()
            ),
            Some(id),
        );
        self.publish(MigrationEvent::RolledBack {
            id: id.clone(),
            backup_file,
        });
        Ok(())
    }

    async fn apply(&self, record: &Record) -> Result<(), RecordError> {
        match self.record_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.migrator.migrate(record)).await {
                Ok(outcome) => outcome.map(|_| ()),
                Err(_) => Err(RecordError(format!("timed out after {:?}", limit))),
            },
            None => self.migrator.migrate(record).await.map(|_| ()),
        }
    }

    fn instance_mut(&mut self, id: &MigrationId) -> EngineResult<&mut MigrationInstance> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| EngineError::InvalidMigrationId(id.to_string()))
    }

    /// Move `id` to a terminal status and release the active slot
    fn finish(&mut self, id: &MigrationId, to: MigrationStatus) -> EngineResult<&MigrationInstance> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| EngineError::InvalidMigrationId(id.to_string()))?;
        instance.finish(to)?;
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        Ok(instance)
    }

    fn publish(&self, event: MigrationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn log(&self, level: LogLevel, message: String, id: Option<&MigrationId>) {
        match level {
            LogLevel::Info => log::info!("{}", message),
            LogLevel::Warn => log::warn!("{}", message),
            LogLevel::Error => log::error!("{}", message),
        }

        let entry = LogEntry::new(level, message, id.cloned());
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&entry) {
                log::warn!(
                    "Could not write migration log in {}: {}",
                    journal.dir().display(),
                    e
                );
            }
        }
        self.publish(MigrationEvent::Log(entry));
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
