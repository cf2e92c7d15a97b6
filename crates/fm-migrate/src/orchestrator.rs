//! Plan orchestrator - runs a migration plan step by step
//!
//! Steps run strictly in order. Progress is recorded in a [`RunState`]
//! that is kept in memory and, when a state file is configured, saved
//! after every step so an interrupted run can be resumed.

use crate::error::{MigrateError, MigrateResult};
use crate::migrator::TableMigrator;
use crate::plan::{MigrationPlan, Step, StepStatus, StepType};
use fm_core::{
    BackupMarker, CoreError, MigrationId, MigrationStatus, PlanOptions, RunState, RunStatus,
    TableName,
};
use fm_db::QueryHandle;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative pause flag, shareable with other tasks
#[derive(Debug, Clone, Default)]
pub struct PauseHandle {
    paused: Arc<AtomicBool>,
}

impl PauseHandle {
    pub fn pause(&self) -> ControlResponse {
        self.paused.store(true, Ordering::SeqCst);
        ControlResponse {
            status: ControlStatus::Paused,
        }
    }

    pub fn resume(&self) -> ControlResponse {
        self.paused.store(false, Ordering::SeqCst);
        ControlResponse {
            status: ControlStatus::Resumed,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Paused,
    Resumed,
}

/// Answer to a pause or resume request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlResponse {
    pub status: ControlStatus,
}

/// One executed step
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionLogEntry {
    pub step: String,
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableName>,
    pub status: StepStatus,
    pub duration: Duration,
    pub records_migrated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How an `execute_plan` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Every step completed
    Completed,
    /// Ran to the end with `continue_on_error`, but these steps failed
    CompletedWithErrors { failed_steps: Vec<String> },
    /// Stopped at the first failing step
    Failed { step: String, error: String },
    /// A pause was observed before `next_step` started
    Paused { next_step: String },
    /// The run for this plan had already completed every step; nothing ran
    AlreadyCompleted { run_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCounts {
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub total_duration: Duration,
    pub records_migrated: u64,
    pub tables_migrated: usize,
}

/// Aggregate view of the execution log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub summary: StepCounts,
    pub stats: ExecutionStats,
}

/// Drives migration plans against one source/target pair
pub struct PlanOrchestrator {
    migrator: TableMigrator,
    backup_dir: PathBuf,
    pause: PauseHandle,
    execution_log: Vec<ExecutionLogEntry>,
    state_file: Option<PathBuf>,
    resume: bool,
    run_state: Option<RunState>,
}

impl PlanOrchestrator {
    /// Create an orchestrator that writes backup markers into `backup_dir`
    pub fn new(
        source: Arc<dyn QueryHandle>,
        target: Arc<dyn QueryHandle>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            migrator: TableMigrator::new(source, target),
            backup_dir: backup_dir.into(),
            pause: PauseHandle::default(),
            execution_log: Vec::new(),
            state_file: None,
            resume: false,
            run_state: None,
        }
    }

    /// Page size for migrate steps
    pub fn with_batch_size(mut self, batch_size: usize) -> MigrateResult<Self> {
        self.migrator.set_batch_size(batch_size)?;
        Ok(self)
    }

    /// Upper bound on a single migrate attempt
    pub fn with_table_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.migrator.set_timeout(timeout);
        self
    }

    /// Save run state to `path` after every step
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Continue the run saved at `path`. The saved state is loaded when a
    /// plan is executed and must belong to that plan.
    pub fn resume_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self.resume = true;
        self
    }

    pub fn create_migration_plan(&self, tables: &[TableName], options: PlanOptions) -> MigrationPlan {
        MigrationPlan::new(tables.to_vec(), options)
    }

    pub fn pause_handle(&self) -> PauseHandle {
        self.pause.clone()
    }

    pub fn pause_migration(&self) -> ControlResponse {
        log::info!("Pause requested; the plan stops before its next step");
        self.pause.pause()
    }

    pub fn resume_migration(&self) -> ControlResponse {
        log::info!("Resume requested");
        self.pause.resume()
    }

    pub fn migrator(&self) -> &TableMigrator {
        &self.migrator
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.run_state.as_ref()
    }

    pub fn execution_log(&self) -> &[ExecutionLogEntry] {
        &self.execution_log
    }

    /// Empty the execution log. Run state and migrator history are kept.
    pub fn clear_log(&mut self) {
        self.execution_log.clear();
    }

    pub fn get_execution_summary(&self) -> ExecutionSummary {
        let completed_steps = self
            .execution_log
            .iter()
            .filter(|e| e.status == StepStatus::Completed)
            .count();
        let failed_steps = self
            .execution_log
            .iter()
            .filter(|e| e.status == StepStatus::Failed)
            .count();
        let tables_migrated = self
            .execution_log
            .iter()
            .filter(|e| e.step_type == StepType::Migrate && e.status == StepStatus::Completed)
            .count();

        ExecutionSummary {
            summary: StepCounts {
                completed_steps,
                failed_steps,
                overall_status: if failed_steps == 0 {
                    OverallStatus::Success
                } else {
                    OverallStatus::Failed
                },
            },
            stats: ExecutionStats {
                total_duration: self.execution_log.iter().map(|e| e.duration).sum(),
                records_migrated: self.execution_log.iter().map(|e| e.records_migrated).sum(),
                tables_migrated,
            },
        }
    }

    /// Run `plan`, skipping steps this run already completed.
    ///
    /// Returns early with [`PlanOutcome::Paused`] when a pause is observed
    /// between steps; call again after resuming to continue. A run that
    /// already completed is reported as [`PlanOutcome::AlreadyCompleted`].
    pub async fn execute_plan(&mut self, plan: &MigrationPlan) -> MigrateResult<PlanOutcome> {
        let mut state = self.take_run_state(plan)?;
        if state.status == RunStatus::Completed {
            log::info!("Run {} already completed every step", state.run_id);
            let run_id = state.run_id.clone();
            self.run_state = Some(state);
            return Ok(PlanOutcome::AlreadyCompleted { run_id });
        }
        state.mark_running();
        self.save_state(&state)?;
        log::info!(
            "Executing plan: {} steps, run {}",
            plan.len(),
            state.run_id
        );

        let options = *plan.options();
        let mut failed: Vec<String> = Vec::new();

        for step in plan.steps() {
            let key = step.key();
            if state.is_completed(&key) {
                log::debug!("Skipping completed step {}", key);
                continue;
            }

            if self.pause.is_paused() {
                log::info!("Paused before step {}", key);
                state.mark_paused();
                self.save_state(&state)?;
                self.run_state = Some(state);
                return Ok(PlanOutcome::Paused { next_step: key });
            }

            let started = Instant::now();
            let result = self.run_step(plan, step, &mut state).await;
            let duration = started.elapsed();

            match result {
                Ok(records_migrated) => {
                    log::info!("Step {} completed in {}ms", key, duration.as_millis());
                    state.mark_completed(&key, duration.as_millis() as u64);
                    self.record(step, StepStatus::Completed, duration, records_migrated, None);
                    self.save_state(&state)?;
                }
                Err(e) => {
                    let error = e.to_string();
                    log::warn!("Step {} failed: {}", key, error);
                    state.mark_failed(&key, &error);
                    self.record(step, StepStatus::Failed, duration, 0, Some(error.clone()));
                    self.save_state(&state)?;

                    if !options.continue_on_error {
                        state.mark_run_finished();
                        self.save_state(&state)?;
                        self.run_state = Some(state);
                        return Ok(PlanOutcome::Failed { step: key, error });
                    }
                    failed.push(key);
                }
            }
        }

        state.mark_run_finished();
        self.save_state(&state)?;
        self.run_state = Some(state);

        if failed.is_empty() {
            Ok(PlanOutcome::Completed)
        } else {
            Ok(PlanOutcome::CompletedWithErrors {
                failed_steps: failed,
            })
        }
    }

    /// Run state to continue for `plan`: the one held in memory if it is
    /// for the same plan, else the saved one when resuming, else a new one.
    fn take_run_state(&mut self, plan: &MigrationPlan) -> MigrateResult<RunState> {
        let fingerprint = plan.fingerprint();

        if let Some(state) = self.run_state.take() {
            if state.plan_fingerprint == fingerprint {
                return Ok(state);
            }
            log::debug!("Discarding run state of a different plan");
        }

        if self.resume {
            if let Some(path) = &self.state_file {
                match RunState::load_for_plan(path, &fingerprint) {
                    Ok(Some(state)) => {
                        log::info!(
                            "Resuming run {} from {} ({} steps done)",
                            state.run_id,
                            path.display(),
                            state.completed_steps.len()
                        );
                        return Ok(state);
                    }
                    Ok(None) => {
                        log::info!("No saved run state at {}; starting fresh", path.display())
                    }
                    Err(CoreError::RunStateMismatch { path }) => {
                        return Err(MigrateError::PlanMismatch { path })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(RunState::new(plan.step_keys(), fingerprint))
    }

    fn save_state(&self, state: &RunState) -> MigrateResult<()> {
        if let Some(path) = &self.state_file {
            state.save(path)?;
        }
        Ok(())
    }

    fn record(
        &mut self,
        step: &Step,
        status: StepStatus,
        duration: Duration,
        records_migrated: u64,
        error: Option<String>,
    ) {
        self.execution_log.push(ExecutionLogEntry {
            step: step.key(),
            step_type: step.step_type,
            table: step.table.clone(),
            status,
            duration,
            records_migrated,
            error,
        });
    }

    /// Execute one step, returning the number of records it migrated
    async fn run_step(
        &mut self,
        plan: &MigrationPlan,
        step: &Step,
        state: &mut RunState,
    ) -> MigrateResult<u64> {
        match step.step_type {
            StepType::Validation if plan.is_post_validation(step) => {
                self.verify_tables(plan.tables()).await?;
                Ok(0)
            }
            StepType::Validation => {
                for table in plan.tables() {
                    let count = self.migrator.count_source(table).await?;
                    log::debug!("Source table '{}' has {} rows", table, count);
                }
                Ok(0)
            }
            StepType::Backup => {
                let marker = BackupMarker::new(MigrationId::generate(), MigrationStatus::InProgress);
                let path = marker.write(&self.backup_dir)?;
                log::info!("Backup marker written to {}", path.display());
                state.backup_file = Some(path);
                Ok(0)
            }
            StepType::Migrate => {
                let table = step
                    .table
                    .as_ref()
                    .ok_or_else(|| MigrateError::MissingTable(step.key()))?;
                self.migrate_with_retries(table, plan.options().max_table_retries)
                    .await
            }
            StepType::Cleanup => {
                if let Some(path) = state.backup_file.take() {
                    remove_marker(&path)?;
                }
                Ok(0)
            }
        }
    }

    async fn verify_tables(&self, tables: &[TableName]) -> MigrateResult<()> {
        for table in tables {
            let result = self.migrator.verify_migration(table).await?;
            if !result.matches {
                return Err(MigrateError::VerificationFailed {
                    table: table.to_string(),
                    source_records: result.source_records,
                    target_records: result.target_records,
                });
            }
        }
        Ok(())
    }

    async fn migrate_with_retries(&mut self, table: &TableName, max_retries: u32) -> MigrateResult<u64> {
        let mut attempt = 0u32;
        loop {
            match self.migrator.migrate_table(table).await {
                Ok(result) => return Ok(result.records_migrated),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    log::warn!(
                        "Retrying '{}' ({}/{}) after error: {}",
                        table,
                        attempt,
                        max_retries,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn remove_marker(path: &Path) -> MigrateResult<()> {
    BackupMarker::remove(path)?;
    log::info!("Removed backup marker {}", path.display());
    Ok(())
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
