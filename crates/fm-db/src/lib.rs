//! fm-db - Query handle abstraction for Fieldmove
//!
//! This crate provides the `QueryHandle` trait that migrations talk to,
//! the query shapes it accepts, and implementations for DuckDB and a
//! process-local in-memory store.

pub mod connect;
pub mod duckdb;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use connect::connect;
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use memory::{MemoryBackend, QueryLogEntry};
pub use query::{QueryOutput, QuerySpec};
pub use traits::QueryHandle;
