//! fm-core - Core library for Fieldmove
//!
//! This crate provides the shared record and dataset types, strongly-typed
//! identifiers, project configuration, backup markers, and plan run state
//! used across all Fieldmove components.

pub mod backup;
pub mod checksum;
pub mod config;
pub mod dataset;
pub mod error;
pub mod identifiers;
mod newtype_string;
pub mod run_state;
pub mod value;

pub use backup::{BackupMarker, MigrationStatus};
pub use checksum::compute_checksum;
pub use config::{
    CoerceType, Config, CsvConfig, DatabaseConfig, DbType, LoadConfig, PlanOptions, TransformDef,
};
pub use dataset::Dataset;
pub use error::{CoreError, CoreResult};
pub use identifiers::{MigrationId, TableName};
pub use run_state::{CompletedStep, FailedStep, RunState, RunStateSummary, RunStatus};
pub use value::{record, Record, Value};
