//! fm-migrate - Table migration and plan orchestration for Fieldmove
//!
//! [`TableMigrator`] copies one table at a time between two query handles.
//! [`PlanOrchestrator`] turns a list of tables into an ordered
//! [`MigrationPlan`] and executes it with pause, resume and retry support.

pub mod error;
pub mod migrator;
pub mod orchestrator;
pub mod plan;

pub use error::{MigrateError, MigrateResult};
pub use migrator::{
    MigrationSummary, TableMigrationResult, TableMigrator, TableStatus, VerificationResult,
    DEFAULT_BATCH_SIZE,
};
pub use orchestrator::{
    ControlResponse, ControlStatus, ExecutionLogEntry, ExecutionStats, ExecutionSummary,
    OverallStatus, PauseHandle, PlanOrchestrator, PlanOutcome, StepCounts,
};
pub use plan::{generate_migration_steps, MigrationPlan, Step, StepStatus, StepType};
