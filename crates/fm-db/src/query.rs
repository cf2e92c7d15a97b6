//! Backend-neutral query descriptions and their outputs
//!
//! These are the only shapes a migration ever asks a handle for. Backends
//! translate them into whatever their storage speaks.

use crate::error::{DbError, DbResult};
use fm_core::{Record, TableName};

/// What to ask a query handle for
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    /// Number of rows in a table
    Count { table: TableName },

    /// One page of rows in a stable order
    Select {
        table: TableName,
        offset: usize,
        limit: usize,
    },

    /// Append rows to a table
    Insert {
        table: TableName,
        rows: Vec<Record>,
    },
}

impl QuerySpec {
    pub fn count(table: &TableName) -> Self {
        QuerySpec::Count {
            table: table.clone(),
        }
    }

    pub fn select(table: &TableName, offset: usize, limit: usize) -> Self {
        QuerySpec::Select {
            table: table.clone(),
            offset,
            limit,
        }
    }

    pub fn insert(table: &TableName, rows: Vec<Record>) -> Self {
        QuerySpec::Insert {
            table: table.clone(),
            rows,
        }
    }

    /// Table the query addresses
    pub fn table(&self) -> &TableName {
        match self {
            QuerySpec::Count { table }
            | QuerySpec::Select { table, .. }
            | QuerySpec::Insert { table, .. } => table,
        }
    }

    /// Short name of the query kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            QuerySpec::Count { .. } => "count",
            QuerySpec::Select { .. } => "select",
            QuerySpec::Insert { .. } => "insert",
        }
    }
}

/// What a query handle answers with
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rows read
    Rows(Vec<Record>),

    /// A row count
    Count(u64),

    /// Acknowledgement of a write
    Ack { rows_affected: usize },
}

impl QueryOutput {
    fn kind(&self) -> &'static str {
        match self {
            QueryOutput::Rows(_) => "rows",
            QueryOutput::Count(_) => "count",
            QueryOutput::Ack { .. } => "ack",
        }
    }

    pub fn into_rows(self) -> DbResult<Vec<Record>> {
        match self {
            QueryOutput::Rows(rows) => Ok(rows),
            other => Err(DbError::UnexpectedOutput {
                expected: "rows",
                found: other.kind(),
            }),
        }
    }

    pub fn into_count(self) -> DbResult<u64> {
        match self {
            QueryOutput::Count(n) => Ok(n),
            other => Err(DbError::UnexpectedOutput {
                expected: "count",
                found: other.kind(),
            }),
        }
    }

    pub fn into_ack(self) -> DbResult<usize> {
        match self {
            QueryOutput::Ack { rows_affected } => Ok(rows_affected),
            other => Err(DbError::UnexpectedOutput {
                expected: "ack",
                found: other.kind(),
            }),
        }
    }
}
