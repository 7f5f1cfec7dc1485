//! Test assertions for pipeline reports.

use crate::core::{StageName, StageStatus};
use crate::pipeline::{PipelineReport, PipelineState};

/// Asserts that the run completed without failures.
pub fn assert_completed(report: &PipelineReport) {
    assert_eq!(
        report.state,
        PipelineState::Completed,
        "Expected a completed run, got {}:\n{report}",
        report.state
    );
}

/// Asserts that the run aborted at `stage`.
pub fn assert_aborted_at(report: &PipelineReport, stage: StageName) {
    assert_eq!(report.state, PipelineState::Aborted, "Expected an aborted run:\n{report}");
    assert_eq!(
        report.first_failure().map(|r| r.stage),
        Some(stage),
        "Expected the run to stop at '{stage}':\n{report}"
    );
}

/// Asserts that a stage ended with the expected status.
pub fn assert_stage_status(report: &PipelineReport, stage: StageName, expected: StageStatus) {
    let actual = report.status_of(stage);
    assert_eq!(
        actual, expected,
        "Expected stage '{stage}' to be {expected}, got {actual}:\n{report}"
    );
}

/// Asserts that every stage was skipped.
pub fn assert_all_skipped(report: &PipelineReport) {
    assert!(
        report.stages.iter().all(|r| r.status == StageStatus::Skipped),
        "Expected every stage to be skipped:\n{report}"
    );
}
