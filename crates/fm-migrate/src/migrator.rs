//! Per-table migration between two query handles
//!
//! A table is copied page by page: one `Count` on the source, then
//! ⌈N/B⌉ `Select` pages, each forwarded to the target as an `Insert`.
//! Only one page is held in memory at a time.

use crate::error::{MigrateError, MigrateResult};
use fm_core::TableName;
use fm_db::{QueryHandle, QuerySpec};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default page size
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Final status of one table migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Completed,
    Failed,
}

/// Outcome of one `migrate_table` call
#[derive(Debug, Clone, Serialize)]
pub struct TableMigrationResult {
    pub table: TableName,
    pub status: TableStatus,
    pub records_migrated: u64,
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Row-count comparison between source and target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub table: TableName,
    pub matches: bool,
    pub source_records: u64,
    pub target_records: u64,
    pub discrepancy: u64,
}

impl VerificationResult {
    fn new(table: TableName, source_records: u64, target_records: u64) -> Self {
        Self {
            table,
            matches: source_records == target_records,
            source_records,
            target_records,
            discrepancy: source_records.abs_diff(target_records),
        }
    }
}

/// Totals across every table migrated so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub completed_tables: usize,
    pub total_records_migrated: u64,
    pub total_duration: Duration,
}

/// Copies tables from a source handle to a target handle
pub struct TableMigrator {
    source: Arc<dyn QueryHandle>,
    target: Arc<dyn QueryHandle>,
    batch_size: usize,
    timeout: Option<Duration>,
    log: Vec<TableMigrationResult>,
}

impl TableMigrator {
    pub fn new(source: Arc<dyn QueryHandle>, target: Arc<dyn QueryHandle>) -> Self {
        Self {
            source,
            target,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
            log: Vec::new(),
        }
    }

    /// Page size used by later migrations
    pub fn set_batch_size(&mut self, batch_size: usize) -> MigrateResult<()> {
        if batch_size == 0 {
            return Err(MigrateError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upper bound on one `migrate_table` call; `None` waits indefinitely
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Copy every row of `table` from source to target.
    ///
    /// Any query failure, or running past the timeout, ends the call. A
    /// `failed` entry is logged before the error is returned. Rows inserted
    /// by earlier pages stay in the target and are counted in that entry.
    pub async fn migrate_table(&mut self, table: &TableName) -> MigrateResult<TableMigrationResult> {
        let started = Instant::now();
        log::info!(
            "Migrating '{}' ({} -> {}, batch size {})",
            table,
            self.source.db_type(),
            self.target.db_type(),
            self.batch_size
        );

        let mut migrated = 0u64;
        let copied = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.copy_pages(table, &mut migrated)).await {
                    Ok(result) => result,
                    Err(_) => Err(MigrateError::Timeout {
                        table: table.to_string(),
                        limit,
                    }),
                }
            }
            None => self.copy_pages(table, &mut migrated).await,
        };

        match copied {
            Ok(()) => {
                let records_migrated = migrated;
                let result = TableMigrationResult {
                    table: table.clone(),
                    status: TableStatus::Completed,
                    records_migrated,
                    duration: started.elapsed(),
                    error: None,
                };
                log::info!(
                    "Migrated {} rows of '{}' in {}ms",
                    records_migrated,
                    table,
                    result.duration.as_millis()
                );
                self.log.push(result.clone());
                Ok(result)
            }
            Err(e) => {
                log::warn!(
                    "Migration of '{}' failed after {} rows: {}",
                    table,
                    migrated,
                    e
                );
                self.log.push(TableMigrationResult {
                    table: table.clone(),
                    status: TableStatus::Failed,
                    records_migrated: migrated,
                    duration: started.elapsed(),
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    /// Copy pages, adding each inserted page to `migrated` as it lands
    async fn copy_pages(&self, table: &TableName, migrated: &mut u64) -> MigrateResult<()> {
        let total = self
            .source
            .query(&QuerySpec::count(table))
            .await?
            .into_count()?;
        let pages = total.div_ceil(self.batch_size as u64);
        log::debug!("'{}' has {} rows in {} pages", table, total, pages);

        for page in 0..pages {
            let offset = page as usize * self.batch_size;
            let rows = self
                .source
                .query(&QuerySpec::select(table, offset, self.batch_size))
                .await?
                .into_rows()?;
            if rows.is_empty() {
                log::debug!("'{}' ran out of rows at offset {}", table, offset);
                break;
            }

            let fetched = rows.len() as u64;
            self.target
                .query(&QuerySpec::insert(table, rows))
                .await?
                .into_ack()?;
            *migrated += fetched;
        }
        Ok(())
    }

    /// Compare row counts of `table` in source and target
    pub async fn verify_migration(&self, table: &TableName) -> MigrateResult<VerificationResult> {
        let source_records = self
            .source
            .query(&QuerySpec::count(table))
            .await?
            .into_count()?;
        let target_records = self
            .target
            .query(&QuerySpec::count(table))
            .await?
            .into_count()?;

        let result = VerificationResult::new(table.clone(), source_records, target_records);
        if result.matches {
            log::info!("{}: {} rows (match)", table, source_records);
        } else {
            log::warn!(
                "{}: source={} target={} (MISMATCH)",
                table,
                source_records,
                target_records
            );
        }
        Ok(result)
    }

    /// Row count of `table` on the source
    pub async fn count_source(&self, table: &TableName) -> MigrateResult<u64> {
        Ok(self
            .source
            .query(&QuerySpec::count(table))
            .await?
            .into_count()?)
    }

    /// Every table migration attempted so far, oldest first
    pub fn migration_log(&self) -> &[TableMigrationResult] {
        &self.log
    }

    /// Totals over the log. Records are counted for completed tables only;
    /// partial rows of a failed table stay visible in its log entry.
    pub fn get_migration_summary(&self) -> MigrationSummary {
        let completed: Vec<_> = self
            .log
            .iter()
            .filter(|r| r.status == TableStatus::Completed)
            .collect();
        MigrationSummary {
            completed_tables: completed.len(),
            total_records_migrated: completed.iter().map(|r| r.records_migrated).sum(),
            total_duration: self.log.iter().map(|r| r.duration).sum(),
        }
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
