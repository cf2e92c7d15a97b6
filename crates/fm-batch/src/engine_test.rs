use super::*;
use crate::strategy::{HandleRecordMigrator, RecordError, RecordOutcome};
use async_trait::async_trait;
use fm_core::{record, TableName, Value};
use fm_db::MemoryBackend;
use std::sync::Arc;
use tempfile::TempDir;

fn batch(ids: &[i64]) -> Vec<Record> {
    ids.iter()
        .map(|i| record([("id", Value::Int(*i)), ("email", Value::text(format!("u{}@x.com", i)))]))
        .collect()
}

/// Rejects records whose id is odd
struct RejectOdd;

#[async_trait]
impl RecordMigrator for RejectOdd {
    async fn migrate(&self, record: &Record) -> Result<RecordOutcome, RecordError> {
        match record.get("id").and_then(Value::to_integer) {
            Some(id) if id % 2 == 1 => Err(RecordError(format!("id {} rejected", id))),
            _ => Ok(RecordOutcome { rows_affected: 1 }),
        }
    }
}

#[tokio::test]
async fn test_start_writes_backup_and_activates() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());

    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    let instance = engine.instance(&id).unwrap();
    assert_eq!(instance.status, MigrationStatus::InProgress);

    let backup = instance.backup_file.clone().unwrap();
    assert!(backup.exists());
    let name = backup.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with(&format!("backup-{}-", id)));
    assert_eq!(BackupMarker::read(&backup).unwrap().migration_id, id);

    assert_eq!(engine.active_migration().unwrap().id, id);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let err = engine
        .start_migration(&MigrationConfig::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::MigrationAlreadyActive(ref active) if *active == id));

    engine.complete_migration(&id).unwrap();
    assert!(engine.start_migration(&MigrationConfig::default()).is_ok());
}

#[tokio::test]
async fn test_batch_counts_failures_and_duplicates() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path())
        .with_duplicate_detector(KeyDuplicateDetector::new(vec!["id".into()]))
        .with_record_migrator(RejectOdd);
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let result = engine
        .process_migration_batch(&id, batch(&[1, 2, 3, 4, 2]))
        .await
        .unwrap();
    assert_eq!(result.batch_size, 5);
    assert_eq!(result.duplicate_count, 1);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 2);
    assert_eq!(result.results.len(), 4);
    assert!(!result.results[0].success);

    let instance = engine.instance(&id).unwrap();
    assert_eq!(instance.total_records, 5);
    assert_eq!(instance.processed_records, 2);
    assert_eq!(instance.failed_records, 2);
    assert_eq!(instance.duplicate_records, 1);
    assert_eq!(instance.errors.len(), 2);
    assert_eq!(instance.errors[0].error, "id 1 rejected");
    assert!(instance.total_records >= instance.processed_records + instance.failed_records);
}

#[tokio::test]
async fn test_validation_warnings_do_not_block() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path())
        .with_validator(RequiredFieldsValidator::new(vec!["name".into()]));
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let result = engine
        .process_migration_batch(&id, batch(&[1, 2]))
        .await
        .unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(engine.instance(&id).unwrap().warnings.len(), 2);
}

#[tokio::test]
async fn test_batch_for_unknown_or_inactive_id() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());

    let stranger = MigrationId::try_new("mig-unknown").unwrap();
    let err = engine
        .process_migration_batch(&stranger, batch(&[1]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMigrationId(_)));

    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine.cancel_migration(&id).unwrap();
    let err = engine
        .process_migration_batch(&id, batch(&[1]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMigrationId(_)));
}

#[tokio::test]
async fn test_complete_reports_success_rate() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path()).with_record_migrator(RejectOdd);
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine
        .process_migration_batch(&id, batch(&[1, 2, 4, 6]))
        .await
        .unwrap();

    let summary = engine.complete_migration(&id).unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);
    assert!((summary.success_rate - 0.75).abs() < f64::EPSILON);

    let instance = engine.instance(&id).unwrap();
    assert_eq!(instance.status, MigrationStatus::Completed);
    assert!(instance.end_time.is_some());
    assert!(engine.active_migration().is_none());
}

#[tokio::test]
async fn test_empty_migration_has_zero_success_rate() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    let summary = engine.complete_migration(&id).unwrap();
    assert_eq!(summary.success_rate, 0.0);
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine.complete_migration(&id).unwrap();

    let err = engine.cancel_migration(&id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: MigrationStatus::Completed,
            to: MigrationStatus::Cancelled,
            ..
        }
    ));
    assert!(matches!(
        engine.rollback_migration(&id).unwrap_err(),
        EngineError::InvalidTransition { .. }
    ));
    assert!(matches!(
        engine.complete_migration(&id).unwrap_err(),
        EngineError::InvalidTransition { .. }
    ));
    assert_eq!(
        engine.instance(&id).unwrap().status,
        MigrationStatus::Completed
    );
}

#[tokio::test]
async fn test_cancel_keeps_applied_records() {
    let dir = TempDir::new().unwrap();
    let target = Arc::new(MemoryBackend::new());
    target.create_table("users").unwrap();
    let mut engine = BatchEngine::new(dir.path()).with_record_migrator(HandleRecordMigrator::new(
        target.clone(),
        TableName::try_new("users").unwrap(),
    ));

    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine
        .process_migration_batch(&id, batch(&[1, 2, 3]))
        .await
        .unwrap();
    engine.cancel_migration(&id).unwrap();

    assert_eq!(
        engine.instance(&id).unwrap().status,
        MigrationStatus::Cancelled
    );
    assert_eq!(target.rows("users").unwrap().len(), 3);
}

#[tokio::test]
async fn test_rollback_reads_marker() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    engine.rollback_migration(&id).unwrap();
    assert_eq!(
        engine.instance(&id).unwrap().status,
        MigrationStatus::RolledBack
    );
    assert!(engine.active_migration().is_none());
}

#[tokio::test]
async fn test_rollback_without_backup() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine
        .start_migration(&MigrationConfig { backup: false })
        .unwrap();

    let err = engine.rollback_migration(&id).unwrap_err();
    assert!(matches!(err, EngineError::NoBackup(_)));
    assert_eq!(
        engine.instance(&id).unwrap().status,
        MigrationStatus::InProgress
    );
}

#[tokio::test]
async fn test_rollback_with_missing_marker_file() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    let backup = engine.instance(&id).unwrap().backup_file.clone().unwrap();
    std::fs::remove_file(&backup).unwrap();

    let err = engine.rollback_migration(&id).unwrap_err();
    assert!(matches!(err, EngineError::Core(_)));
}

#[tokio::test]
async fn test_events_are_published() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path());
    let mut events = engine.subscribe();

    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine
        .process_migration_batch(&id, batch(&[1]))
        .await
        .unwrap();
    engine.complete_migration(&id).unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(matches!(received[0], MigrationEvent::Started { .. }));
    assert!(received
        .iter()
        .any(|e| matches!(e, MigrationEvent::BatchProcessed { batch_size: 1, .. })));
    assert!(matches!(
        received.last(),
        Some(MigrationEvent::Completed(summary)) if summary.processed == 1
    ));
    assert!(received
        .iter()
        .any(|e| matches!(e, MigrationEvent::Log(entry) if entry.migration_id.as_ref() == Some(&id))));
}

#[tokio::test]
async fn test_journal_receives_entries() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    let mut engine = BatchEngine::new(dir.path().join("backups")).with_log_dir(&log_dir);

    let id = engine.start_migration(&MigrationConfig::default()).unwrap();
    engine.cancel_migration(&id).unwrap();

    let files: Vec<_> = std::fs::read_dir(&log_dir).unwrap().collect();
    assert_eq!(files.len(), 1);
    let content = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    assert!(content.contains("[INFO]"));
    assert!(content.contains(&format!("Migration {} cancelled", id)));
}

/// Applies records into a memory table, stalling on the id given
struct StallOn {
    db: Arc<MemoryBackend>,
    stall_id: i64,
}

#[async_trait]
impl RecordMigrator for StallOn {
    async fn migrate(&self, record: &Record) -> Result<RecordOutcome, RecordError> {
        if record.get("id").and_then(Value::to_integer) == Some(self.stall_id) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        let inner = HandleRecordMigrator::new(self.db.clone(), TableName::try_new("users").unwrap());
        inner.migrate(record).await
    }
}

fn stalling_engine(dir: &TempDir, stall_id: i64) -> (BatchEngine, Arc<MemoryBackend>) {
    let db = Arc::new(MemoryBackend::new());
    db.create_table("users").unwrap();
    let engine = BatchEngine::new(dir.path()).with_record_migrator(StallOn {
        db: db.clone(),
        stall_id,
    });
    (engine, db)
}

#[tokio::test]
async fn test_record_timeout_counts_record_as_failed() {
    let dir = TempDir::new().unwrap();
    let (engine, db) = stalling_engine(&dir, 2);
    let mut engine = engine.with_record_timeout(Some(Duration::from_millis(50)));
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let result = engine.process_migration_batch(&id, batch(&[1, 2, 3])).await.unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert!(result.results[1].error.as_deref().unwrap().contains("timed out"));
    assert_eq!(db.rows("users").unwrap().len(), 2);

    let instance = engine.instance(&id).unwrap();
    assert_eq!(instance.processed_records, 2);
    assert_eq!(instance.failed_records, 1);
}

#[tokio::test]
async fn test_dropped_batch_keeps_counts_of_applied_records() {
    let dir = TempDir::new().unwrap();
    let (mut engine, db) = stalling_engine(&dir, 2);
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        engine.process_migration_batch(&id, batch(&[1, 2, 3])),
    )
    .await
    .is_err();
    assert!(timed_out);
    assert_eq!(db.rows("users").unwrap().len(), 1);

    engine.cancel_migration(&id).unwrap();
    let instance = engine.instance(&id).unwrap();
    assert_eq!(instance.status, MigrationStatus::Cancelled);
    assert_eq!(instance.total_records, 3);
    assert_eq!(instance.processed_records, 1);
    assert_eq!(instance.failed_records, 0);
}

#[tokio::test]
async fn test_failed_record_can_be_resubmitted() {
    let dir = TempDir::new().unwrap();
    let mut engine = BatchEngine::new(dir.path())
        .with_duplicate_detector(KeyDuplicateDetector::new(vec!["id".into()]))
        .with_record_migrator(RejectOdd);
    let id = engine.start_migration(&MigrationConfig::default()).unwrap();

    let first = engine.process_migration_batch(&id, batch(&[1, 2])).await.unwrap();
    assert_eq!(first.failure_count, 1);

    // id 1 failed and is retried; id 2 was applied and is a duplicate
    let second = engine.process_migration_batch(&id, batch(&[1, 2])).await.unwrap();
    assert_eq!(second.duplicate_count, 1);
    assert_eq!(second.failure_count, 1);
    assert_eq!(engine.instance(&id).unwrap().failed_records, 2);
}
