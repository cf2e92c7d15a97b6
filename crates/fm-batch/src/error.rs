//! Error types for fm-batch

use fm_core::{CoreError, MigrationId, MigrationStatus};
use thiserror::Error;

/// Batch engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Id is unknown, or not the active in-progress migration (B001)
    #[error("[B001] Invalid migration id: {0}")]
    InvalidMigrationId(String),

    /// Another migration is still in progress (B002)
    #[error("[B002] Migration {0} is already in progress; complete, cancel, or roll it back first")]
    MigrationAlreadyActive(MigrationId),

    /// Rollback requested but no backup marker was written (B003)
    #[error("[B003] Migration {0} has no backup to roll back to")]
    NoBackup(MigrationId),

    /// Status change out of a terminal state (B004)
    #[error("[B004] Migration {id} is {from}; cannot move to {to}")]
    InvalidTransition {
        id: MigrationId,
        from: MigrationStatus,
        to: MigrationStatus,
    },

    /// Backup marker I/O failed (B005)
    #[error("[B005] {0}")]
    Core(#[from] CoreError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
