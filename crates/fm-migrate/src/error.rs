//! Error types for fm-migrate

use fm_core::CoreError;
use fm_db::DbError;
use std::time::Duration;
use thiserror::Error;

/// Migration and orchestration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A source or target query failed (M001)
    #[error("[M001] Query failed: {0}")]
    Db(#[from] DbError),

    /// Backup marker or run state I/O failed (M002)
    #[error("[M002] {0}")]
    Core(#[from] CoreError),

    /// Batch size must be at least one row (M003)
    #[error("[M003] Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(usize),

    /// Row counts differ between source and target after migration (M004)
    #[error("[M004] Verification failed for '{table}': source has {source_records} rows, target has {target_records}")]
    VerificationFailed {
        table: String,
        source_records: u64,
        target_records: u64,
    },

    /// Saved run state belongs to a different plan (M005)
    #[error("[M005] Run state at {path} was written for a different plan; delete it to start fresh")]
    PlanMismatch { path: String },

    /// A migrate step carries no table (M006)
    #[error("[M006] Step '{0}' has no table to migrate")]
    MissingTable(String),

    /// A table migration exceeded its time limit (M007)
    #[error("[M007] Migrating '{table}' timed out after {limit:?}")]
    Timeout { table: String, limit: Duration },
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
