//! Assertions over run results and emitted events.

use crate::core::{RunResult, RunStatus, StageId, StageStatus};
use crate::events::CollectingEventSink;

/// Asserts that the run succeeded with both stages succeeded.
pub fn assert_run_succeeded(result: &RunResult) {
    assert_eq!(
        result.status,
        RunStatus::Succeeded,
        "Expected success, got {:?} (failed_stage: {:?}, error: {:?})",
        result.status,
        result.failed_stage,
        result.error
    );
    for id in StageId::ALL {
        assert_stage_status(result, id, StageStatus::Succeeded);
    }
}

/// Asserts that the run failed in `stage`.
pub fn assert_run_failed_at(result: &RunResult, stage: StageId) {
    assert_eq!(
        result.status,
        RunStatus::Failed,
        "Expected failure, got {:?}",
        result.status
    );
    assert_eq!(
        result.failed_stage,
        Some(stage),
        "Expected failure in '{stage}', got {:?}",
        result.failed_stage
    );
    assert!(result.error.is_some(), "Failed run carries no error message");
}

/// Asserts that the run was skipped and touched no stage.
pub fn assert_run_skipped(result: &RunResult) {
    assert_eq!(
        result.status,
        RunStatus::Skipped,
        "Expected skip, got {:?}",
        result.status
    );
    assert!(result.release.is_none(), "Skipped run created a release");
    assert!(result.uploaded.is_empty(), "Skipped run uploaded {:?}", result.uploaded);
    assert!(
        result
            .stages
            .iter()
            .all(|s| s.status == StageStatus::Pending),
        "Skipped run moved a stage: {:?}",
        result.stages
    );
}

/// Asserts the status of one stage in the result.
pub fn assert_stage_status(result: &RunResult, stage: StageId, expected: StageStatus) {
    let actual = result.stage(stage).map(|s| s.status);
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{stage}' to be {expected}, got {actual:?}"
    );
}

/// Asserts the exact sequence of event types collected by `sink`.
pub fn assert_event_order(sink: &CollectingEventSink, expected: &[&str]) {
    let actual = sink.event_types();
    assert_eq!(actual, expected, "Unexpected event sequence");
}
