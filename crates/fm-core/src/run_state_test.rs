use super::*;
use tempfile::tempdir;

fn steps() -> Vec<String> {
    vec![
        "00-backup".to_string(),
        "01-migrate-users".to_string(),
        "02-migrate-orders".to_string(),
    ]
}

#[test]
fn test_run_state_new() {
    let state = RunState::new(steps(), "abc".to_string());
    assert_eq!(state.status, RunStatus::Running);
    assert_eq!(state.pending_steps.len(), 3);
    assert!(state.completed_steps.is_empty());
    assert_eq!(state.run_id.len(), 8);
}

#[test]
fn test_mark_completed_and_failed() {
    let mut state = RunState::new(steps(), "abc".to_string());
    state.mark_completed("00-backup", 5);
    state.mark_failed("01-migrate-users", "connection reset");

    assert!(state.is_completed("00-backup"));
    assert!(state.is_failed("01-migrate-users"));
    assert_eq!(state.pending_steps, vec!["02-migrate-orders".to_string()]);

    // A successful retry clears the failure
    state.mark_completed("01-migrate-users", 7);
    assert!(!state.is_failed("01-migrate-users"));

    let summary = state.summary();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.total_duration_ms, 12);
}

#[test]
fn test_mark_run_finished() {
    let mut state = RunState::new(steps(), "abc".to_string());
    state.mark_failed("00-backup", "disk full");
    state.mark_run_finished();
    assert_eq!(state.status, RunStatus::Failed);

    let mut ok = RunState::new(vec!["00-backup".to_string()], "abc".to_string());
    ok.mark_completed("00-backup", 1);
    ok.mark_run_finished();
    assert_eq!(ok.status, RunStatus::Completed);
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("run_state.json");

    let mut state = RunState::new(steps(), "fp-1".to_string());
    state.mark_completed("00-backup", 3);
    state.mark_paused();
    state.save(&path).unwrap();

    let loaded = RunState::load(&path).unwrap().unwrap();
    assert_eq!(loaded.run_id, state.run_id);
    assert_eq!(loaded.status, RunStatus::Paused);
    assert!(loaded.is_completed("00-backup"));
}

#[test]
fn test_load_nonexistent() {
    let dir = tempdir().unwrap();
    let loaded = RunState::load(&dir.path().join("missing.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_load_for_plan_rejects_other_fingerprint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run_state.json");
    RunState::new(steps(), "fp-1".to_string())
        .save(&path)
        .unwrap();

    assert!(RunState::load_for_plan(&path, "fp-1").unwrap().is_some());
    let err = RunState::load_for_plan(&path, "fp-2").unwrap_err();
    assert!(matches!(err, CoreError::RunStateMismatch { .. }));
}

#[test]
fn test_status_display() {
    assert_eq!(RunStatus::Running.to_string(), "running");
    assert_eq!(RunStatus::Paused.to_string(), "paused");
    assert_eq!(RunStatus::Completed.to_string(), "completed");
    assert_eq!(RunStatus::Failed.to_string(), "failed");
}
