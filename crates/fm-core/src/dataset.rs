//! In-memory, column-named collection of records

use crate::value::Record;
use serde::{Deserialize, Serialize};

/// Ordered records plus the ordered column list they were read with.
///
/// Columns are fixed for a dataset; individual records may leave some of
/// them unpopulated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Empty dataset with the given header
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check whether a column is part of the header
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append all records of another chunk read with the same header
    pub fn extend(&mut self, other: Dataset) {
        self.records.extend(other.records);
    }
}
