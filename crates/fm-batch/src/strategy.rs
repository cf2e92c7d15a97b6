//! Pluggable per-batch strategies
//!
//! The engine is handed one of each at construction: a [`Validator`] whose
//! findings become warnings, a [`DuplicateDetector`] that removes repeated
//! records, and a [`RecordMigrator`] that applies each remaining record.

use async_trait::async_trait;
use fm_core::{Record, TableName, Value};
use fm_db::{DbError, QueryHandle, QuerySpec};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Result of validating one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks a batch before it is applied; never blocks it
pub trait Validator: Send + Sync {
    fn validate(&self, records: &[Record]) -> ValidationOutcome;
}

/// Result of de-duplicating one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateOutcome {
    pub unique: Vec<Record>,
    pub duplicates: Vec<Record>,
    pub count: usize,
}

/// Splits a batch into records to apply and duplicates to skip
pub trait DuplicateDetector: Send + Sync {
    fn detect(&self, records: Vec<Record>) -> DuplicateOutcome;

    /// Forget anything remembered from earlier batches
    fn reset(&self) {}

    /// Forget one record that was let through but could not be applied, so
    /// a later resubmission is not treated as a duplicate
    fn forget(&self, _record: &Record) {}
}

/// Successful application of one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub rows_affected: usize,
}

/// Failure to apply one record; recorded, never fatal for the batch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RecordError(pub String);

impl From<DbError> for RecordError {
    fn from(err: DbError) -> Self {
        RecordError(err.to_string())
    }
}

/// Applies one record to wherever the migration is writing
#[async_trait]
pub trait RecordMigrator: Send + Sync {
    async fn migrate(&self, record: &Record) -> Result<RecordOutcome, RecordError>;
}

/// Flags records that lack a value (or hold null) for any required field
#[derive(Debug, Clone, Default)]
pub struct RequiredFieldsValidator {
    fields: Vec<String>,
}

impl RequiredFieldsValidator {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl Validator for RequiredFieldsValidator {
    fn validate(&self, records: &[Record]) -> ValidationOutcome {
        let errors = records
            .iter()
            .enumerate()
            .flat_map(|(idx, record)| {
                self.fields.iter().filter_map(move |field| {
                    match record.get(field) {
                        Some(value) if !value.is_null() => None,
                        _ => Some(format!("record {}: missing required field '{}'", idx, field)),
                    }
                })
            })
            .collect();
        ValidationOutcome::from_errors(errors)
    }
}

/// Treats records with equal key-column values as duplicates.
///
/// Keys are remembered across batches until [`DuplicateDetector::reset`],
/// so a repeat in a later batch is caught too. Keys of records that failed
/// to apply are dropped through [`DuplicateDetector::forget`]. With no key
/// columns nothing is ever a duplicate.
#[derive(Debug, Default)]
pub struct KeyDuplicateDetector {
    key_columns: Vec<String>,
    seen: Mutex<HashSet<Vec<String>>>,
}

impl KeyDuplicateDetector {
    pub fn new(key_columns: Vec<String>) -> Self {
        Self {
            key_columns,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn key(&self, record: &Record) -> Vec<String> {
        self.key_columns
            .iter()
            .map(|c| record.get(c).map(Value::to_string).unwrap_or_default())
            .collect()
    }
}

impl DuplicateDetector for KeyDuplicateDetector {
    fn detect(&self, records: Vec<Record>) -> DuplicateOutcome {
        if self.key_columns.is_empty() {
            return DuplicateOutcome {
                unique: records,
                ..DuplicateOutcome::default()
            };
        }

        // Every insert or removal leaves the set consistent, so a poisoned
        // lock still holds valid keys
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let (unique, duplicates): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| seen.insert(self.key(r)));
        DuplicateOutcome {
            count: duplicates.len(),
            unique,
            duplicates,
        }
    }

    fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn forget(&self, record: &Record) {
        if self.key_columns.is_empty() {
            return;
        }
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key(record));
    }
}

/// Accepts every record without writing it anywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMigrator;

#[async_trait]
impl RecordMigrator for PassthroughMigrator {
    async fn migrate(&self, _record: &Record) -> Result<RecordOutcome, RecordError> {
        Ok(RecordOutcome { rows_affected: 0 })
    }
}

/// Inserts each record into `table` through a query handle
pub struct HandleRecordMigrator {
    handle: Arc<dyn QueryHandle>,
    table: TableName,
}

impl HandleRecordMigrator {
    pub fn new(handle: Arc<dyn QueryHandle>, table: TableName) -> Self {
        Self { handle, table }
    }
}

#[async_trait]
impl RecordMigrator for HandleRecordMigrator {
    async fn migrate(&self, record: &Record) -> Result<RecordOutcome, RecordError> {
        let rows_affected = self
            .handle
            .query(&QuerySpec::insert(&self.table, vec![record.clone()]))
            .await?
            .into_ack()?;
        Ok(RecordOutcome { rows_affected })
    }
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
