//! Open a query handle from configuration

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::memory::MemoryBackend;
use crate::traits::QueryHandle;
use fm_core::{DatabaseConfig, DbType};
use std::sync::Arc;

/// Open the backend described by a `source`/`target` config block
pub fn connect(config: &DatabaseConfig) -> DbResult<Arc<dyn QueryHandle>> {
    log::debug!("Opening {:?} database at {}", config.db_type, config.path);
    match config.db_type {
        DbType::DuckDb => Ok(Arc::new(DuckDbBackend::new(&config.path)?)),
        DbType::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_by_type() {
        let duck = DatabaseConfig {
            db_type: DbType::DuckDb,
            path: ":memory:".to_string(),
        };
        assert_eq!(connect(&duck).unwrap().db_type(), "duckdb");

        let mem = DatabaseConfig {
            db_type: DbType::Memory,
            path: String::new(),
        };
        assert_eq!(connect(&mem).unwrap().db_type(), "memory");
    }
}
