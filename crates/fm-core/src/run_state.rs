//! Plan run state for partial execution recovery
//!
//! Tracks which steps of a migration plan have completed or failed so a plan
//! that stopped partway (failure or pause) can be resumed without re-running
//! finished steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// State of a plan run in progress or finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique identifier for this run
    pub run_id: String,

    /// Fingerprint of the plan this state was recorded for
    pub plan_fingerprint: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the state was last updated
    pub last_updated_at: DateTime<Utc>,

    /// Current status of the run
    pub status: RunStatus,

    /// Steps that have completed successfully
    pub completed_steps: Vec<CompletedStep>,

    /// Steps whose latest attempt failed
    pub failed_steps: Vec<FailedStep>,

    /// Steps that have not run yet
    pub pending_steps: Vec<String>,

    /// Backup marker written by the run's backup step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<PathBuf>,
}

/// Status of a plan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is currently executing steps
    Running,
    /// Run stopped at a step boundary because a pause was requested
    Paused,
    /// Every step completed
    Completed,
    /// At least one step failed
    Failed,
}

/// A step that completed successfully
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    /// Step key
    pub key: String,

    /// When the step completed
    pub completed_at: DateTime<Utc>,

    /// How long the step took (in milliseconds)
    pub duration_ms: u64,
}

/// A step that failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedStep {
    /// Step key
    pub key: String,

    /// When the step failed
    pub failed_at: DateTime<Utc>,

    /// Error message
    pub error: String,
}

impl RunState {
    /// Create a new run state for a plan whose steps are all pending
    pub fn new(pending_steps: Vec<String>, plan_fingerprint: String) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            plan_fingerprint,
            started_at: Utc::now(),
            last_updated_at: Utc::now(),
            status: RunStatus::Running,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            pending_steps,
            backup_file: None,
        }
    }

    /// Load run state from a file path, `None` if there is no file
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| CoreError::io_with_path(path, e))?;
        let state: RunState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Load run state and require it to belong to the given plan
    pub fn load_for_plan(path: &Path, plan_fingerprint: &str) -> CoreResult<Option<Self>> {
        match Self::load(path)? {
            Some(state) if state.plan_fingerprint != plan_fingerprint => {
                Err(CoreError::RunStateMismatch {
                    path: path.display().to_string(),
                })
            }
            other => Ok(other),
        }
    }

    /// Save run state to a file path atomically
    ///
    /// Uses write-to-temp-then-rename pattern to prevent corruption
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CoreError::io_with_path(parent, e))?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json).map_err(|e| CoreError::io_with_path(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| CoreError::io_with_path(path, e))?;

        Ok(())
    }

    /// Mark a step as completed, clearing any earlier failure for it
    pub fn mark_completed(&mut self, key: &str, duration_ms: u64) {
        self.pending_steps.retain(|k| k != key);
        self.failed_steps.retain(|s| s.key != key);

        self.completed_steps.push(CompletedStep {
            key: key.to_string(),
            completed_at: Utc::now(),
            duration_ms,
        });

        self.last_updated_at = Utc::now();
    }

    /// Mark a step as failed
    pub fn mark_failed(&mut self, key: &str, error: &str) {
        self.pending_steps.retain(|k| k != key);
        self.failed_steps.retain(|s| s.key != key);

        self.failed_steps.push(FailedStep {
            key: key.to_string(),
            failed_at: Utc::now(),
            error: error.to_string(),
        });

        self.last_updated_at = Utc::now();
    }

    /// Mark the run as paused at a step boundary
    pub fn mark_paused(&mut self) {
        self.status = RunStatus::Paused;
        self.last_updated_at = Utc::now();
    }

    /// Mark the run as running again
    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
        self.last_updated_at = Utc::now();
    }

    /// Mark the run as finished
    pub fn mark_run_finished(&mut self) {
        self.status = if self.failed_steps.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.last_updated_at = Utc::now();
    }

    /// Check if a step has already been completed
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed_steps.iter().any(|s| s.key == key)
    }

    /// Check if a step's latest attempt failed
    pub fn is_failed(&self, key: &str) -> bool {
        self.failed_steps.iter().any(|s| s.key == key)
    }

    /// Get summary statistics
    pub fn summary(&self) -> RunStateSummary {
        RunStateSummary {
            completed: self.completed_steps.len(),
            failed: self.failed_steps.len(),
            pending: self.pending_steps.len(),
            total_duration_ms: self.completed_steps.iter().map(|s| s.duration_ms).sum(),
        }
    }
}

/// Summary statistics for a run state
#[derive(Debug, Clone)]
pub struct RunStateSummary {
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub total_duration_ms: u64,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
#[path = "run_state_test.rs"]
mod tests;
