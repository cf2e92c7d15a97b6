//! fm-batch - Batch execution engine for Fieldmove
//!
//! Applies records batch by batch through injected strategies, tracks each
//! migration's lifecycle and counters, and reports progress as typed events
//! and a durable daily log.

pub mod engine;
pub mod error;
pub mod event;
pub mod journal;
pub mod strategy;

pub use engine::{
    BatchEngine, BatchResult, MigrationConfig, MigrationInstance, RecordFailure, RecordResult,
};
pub use error::{EngineError, EngineResult};
pub use event::{CompletionSummary, LogEntry, LogLevel, MigrationEvent};
pub use journal::Journal;
pub use strategy::{
    DuplicateDetector, DuplicateOutcome, HandleRecordMigrator, KeyDuplicateDetector,
    PassthroughMigrator, RecordError, RecordMigrator, RecordOutcome, RequiredFieldsValidator,
    ValidationOutcome, Validator,
};
