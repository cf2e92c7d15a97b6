//! Query handle trait definition

use crate::error::DbResult;
use crate::query::{QueryOutput, QuerySpec};
use async_trait::async_trait;

/// The single capability a migration needs from a database: run a query
/// description and return rows, a count, or a write acknowledgement.
///
/// Migrations never look behind this trait, so any storage that can answer
/// [`QuerySpec`]s can be a source or a target. Implementations must be
/// Send + Sync for async operation.
#[async_trait]
pub trait QueryHandle: Send + Sync {
    /// Execute one query
    async fn query(&self, spec: &QuerySpec) -> DbResult<QueryOutput>;

    /// Backend type identifier for logging
    fn db_type(&self) -> &'static str;
}
