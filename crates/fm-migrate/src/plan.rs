//! Migration plans: the ordered steps one orchestrated run executes

use fm_core::{compute_checksum, PlanOptions, TableName};
use serde::Serialize;
use std::fmt;

/// Kind of work a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Validation,
    Backup,
    Migrate,
    Cleanup,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepType::Validation => "validation",
            StepType::Backup => "backup",
            StepType::Migrate => "migrate",
            StepType::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Status of a step or of a logged step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One unit of work in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub index: usize,
    pub step_type: StepType,
    /// Present only for migrate steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableName>,
    pub status: StepStatus,
}

impl Step {
    fn new(index: usize, step_type: StepType, table: Option<TableName>) -> Self {
        Self {
            index,
            step_type,
            table,
            status: StepStatus::Pending,
        }
    }

    /// Stable identifier used in run state, e.g. `02-migrate-users`
    pub fn key(&self) -> String {
        match &self.table {
            Some(table) => format!("{:02}-{}-{}", self.index, self.step_type, table),
            None => format!("{:02}-{}", self.index, self.step_type),
        }
    }
}

/// Build the ordered step list for `tables`.
///
/// Order: optional pre-validation, backup, one migrate per table in the
/// given order, optional post-validation, optional cleanup.
pub fn generate_migration_steps(tables: &[TableName], options: &PlanOptions) -> Vec<Step> {
    let mut kinds: Vec<(StepType, Option<TableName>)> = Vec::with_capacity(tables.len() + 4);

    if options.pre_validation {
        kinds.push((StepType::Validation, None));
    }
    kinds.push((StepType::Backup, None));
    kinds.extend(tables.iter().map(|t| (StepType::Migrate, Some(t.clone()))));
    if options.post_validation {
        kinds.push((StepType::Validation, None));
    }
    if options.post_cleanup {
        kinds.push((StepType::Cleanup, None));
    }

    kinds
        .into_iter()
        .enumerate()
        .map(|(index, (step_type, table))| Step::new(index, step_type, table))
        .collect()
}

/// An immutable, ordered migration plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    tables: Vec<TableName>,
    options: PlanOptions,
    steps: Vec<Step>,
}

impl MigrationPlan {
    pub fn new(tables: Vec<TableName>, options: PlanOptions) -> Self {
        let steps = generate_migration_steps(&tables, &options);
        Self {
            tables,
            options,
            steps,
        }
    }

    pub fn tables(&self) -> &[TableName] {
        &self.tables
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_keys(&self) -> Vec<String> {
        self.steps.iter().map(Step::key).collect()
    }

    /// SHA-256 over the step keys; two plans with the same steps share it
    pub fn fingerprint(&self) -> String {
        compute_checksum(&self.step_keys().join("\n"))
    }

    /// True for a validation step that runs after the backup, i.e. the
    /// post-migration verification
    pub fn is_post_validation(&self, step: &Step) -> bool {
        step.step_type == StepType::Validation
            && self
                .steps
                .iter()
                .find(|s| s.step_type == StepType::Backup)
                .is_some_and(|backup| step.index > backup.index)
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
