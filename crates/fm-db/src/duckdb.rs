//! DuckDB query handle implementation

use crate::error::{DbError, DbResult};
use crate::query::{QueryOutput, QuerySpec};
use crate::traits::QueryHandle;
use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use fm_core::{Record, TableName, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute one or more SQL statements, e.g. to create target tables
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn count_sync(&self, table: &TableName) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_table(table)?);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn select_sync(&self, table: &TableName, offset: usize, limit: usize) -> DbResult<Vec<Record>> {
        // ORDER BY ALL gives pages a stable order across calls
        let sql = format!(
            "SELECT * FROM {} ORDER BY ALL LIMIT {} OFFSET {}",
            quote_table(table)?,
            limit,
            offset
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (idx, name) in columns.iter().enumerate() {
                let value: DuckValue = row.get(idx)?;
                record.insert(name.clone(), from_duck(value));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn insert_sync(&self, table: &TableName, rows: &[Record]) -> DbResult<usize> {
        match insert_sql(table, rows)? {
            Some(sql) => {
                let conn = self.lock()?;
                Ok(conn.execute(&sql, [])?)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl QueryHandle for DuckDbBackend {
    async fn query(&self, spec: &QuerySpec) -> DbResult<QueryOutput> {
        match spec {
            QuerySpec::Count { table } => self.count_sync(table).map(QueryOutput::Count),
            QuerySpec::Select {
                table,
                offset,
                limit,
            } => self
                .select_sync(table, *offset, *limit)
                .map(QueryOutput::Rows),
            QuerySpec::Insert { table, rows } => self
                .insert_sync(table, rows)
                .map(|rows_affected| QueryOutput::Ack { rows_affected }),
        }
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Quote a possibly schema-qualified table name
fn quote_table(table: &TableName) -> DbResult<String> {
    let parts: Vec<String> = table
        .split('.')
        .map(|part| {
            if part.is_empty() {
                Err(DbError::InvalidIdentifier(table.to_string()))
            } else {
                Ok(quote_ident(part))
            }
        })
        .collect::<DbResult<_>>()?;
    Ok(parts.join("."))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => format!("{:?}", f),
        Value::Float(_) => "NULL".to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Build a multi-row INSERT covering the union of the rows' columns;
/// `None` when there is nothing to insert.
fn insert_sql(table: &TableName, rows: &[Record]) -> DbResult<Option<String>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();
    if columns.is_empty() {
        return Ok(None);
    }

    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let values = rows
        .iter()
        .map(|row| {
            let cells = columns
                .iter()
                .map(|c| row.get(*c).map(literal).unwrap_or_else(|| "NULL".to_string()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", cells)
        })
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Some(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_table(table)?,
        column_list,
        values
    )))
}

fn from_duck(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i64::from(i)),
        DuckValue::SmallInt(i) => Value::Int(i64::from(i)),
        DuckValue::Int(i) => Value::Int(i64::from(i)),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::UTinyInt(i) => Value::Int(i64::from(i)),
        DuckValue::USmallInt(i) => Value::Int(i64::from(i)),
        DuckValue::UInt(i) => Value::Int(i64::from(i)),
        DuckValue::UBigInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::Float(f) => Value::Float(f64::from(f)),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => Value::Text(d.to_string()),
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        other => Value::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
