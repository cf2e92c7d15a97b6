//! Process-local in-memory query handle
//!
//! Tables are plain vectors of records kept in insertion order. Every query
//! is recorded in a log so callers can see exactly what a migration asked
//! for.

use crate::error::{DbError, DbResult};
use crate::query::{QueryOutput, QuerySpec};
use crate::traits::QueryHandle;
use async_trait::async_trait;
use fm_core::Record;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// One query received by a [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLogEntry {
    pub kind: &'static str,
    pub table: String,
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    log: Mutex<Vec<QueryLogEntry>>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> DbError {
    DbError::MutexPoisoned(e.to_string())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> DbResult<MutexGuard<'_, HashMap<String, Vec<Record>>>> {
        self.tables.lock().map_err(poisoned)
    }

    /// Create (or replace) a table holding `rows`
    pub fn put_table(&self, name: &str, rows: Vec<Record>) -> DbResult<()> {
        self.tables()?.insert(name.to_string(), rows);
        Ok(())
    }

    /// Create an empty table if it does not exist yet
    pub fn create_table(&self, name: &str) -> DbResult<()> {
        self.tables()?.entry(name.to_string()).or_default();
        Ok(())
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, name: &str) -> DbResult<Vec<Record>> {
        self.tables()?
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    /// Every query received so far, in order
    pub fn query_log(&self) -> DbResult<Vec<QueryLogEntry>> {
        Ok(self.log.lock().map_err(poisoned)?.clone())
    }

    /// Number of queries of one kind received so far
    pub fn query_count(&self, kind: &str) -> DbResult<usize> {
        Ok(self
            .log
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|e| e.kind == kind)
            .count())
    }
}

#[async_trait]
impl QueryHandle for MemoryBackend {
    async fn query(&self, spec: &QuerySpec) -> DbResult<QueryOutput> {
        self.log.lock().map_err(poisoned)?.push(QueryLogEntry {
            kind: spec.kind(),
            table: spec.table().to_string(),
        });

        let mut tables = self.tables()?;
        let rows = tables
            .get_mut(spec.table().as_str())
            .ok_or_else(|| DbError::TableNotFound(spec.table().to_string()))?;

        match spec {
            QuerySpec::Count { .. } => Ok(QueryOutput::Count(rows.len() as u64)),
            QuerySpec::Select { offset, limit, .. } => Ok(QueryOutput::Rows(
                rows.iter().skip(*offset).take(*limit).cloned().collect(),
            )),
            QuerySpec::Insert { rows: new_rows, .. } => {
                rows.extend(new_rows.iter().cloned());
                Ok(QueryOutput::Ack {
                    rows_affected: new_rows.len(),
                })
            }
        }
    }

    fn db_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::{record, TableName, Value};

    fn users() -> TableName {
        TableName::try_new("users").unwrap()
    }

    #[tokio::test]
    async fn test_count_select_insert() {
        let db = MemoryBackend::new();
        db.put_table(
            "users",
            (1..=5).map(|i| record([("id", Value::Int(i))])).collect(),
        )
        .unwrap();

        let count = db.query(&QuerySpec::count(&users())).await.unwrap();
        assert_eq!(count, QueryOutput::Count(5));

        let page = db
            .query(&QuerySpec::select(&users(), 3, 10))
            .await
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["id"], Value::Int(4));

        let ack = db
            .query(&QuerySpec::insert(&users(), vec![record([("id", Value::Int(6))])]))
            .await
            .unwrap();
        assert_eq!(ack, QueryOutput::Ack { rows_affected: 1 });
        assert_eq!(db.rows("users").unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_missing_table() {
        let db = MemoryBackend::new();
        let err = db.query(&QuerySpec::count(&users())).await.unwrap_err();
        assert!(matches!(err, DbError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_query_log_records_every_query() {
        let db = MemoryBackend::new();
        db.create_table("users").unwrap();
        db.query(&QuerySpec::count(&users())).await.unwrap();
        db.query(&QuerySpec::select(&users(), 0, 1)).await.unwrap();
        let _ = db
            .query(&QuerySpec::count(&TableName::try_new("ghost").unwrap()))
            .await;

        let log = db.query_log().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].kind, "select");
        assert_eq!(log[2].table, "ghost");
        assert_eq!(db.query_count("count").unwrap(), 2);
    }
}
