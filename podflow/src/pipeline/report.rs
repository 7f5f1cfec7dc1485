//! Pipeline run reports.

use crate::core::{Artifact, ArtifactKind, StageName, StageOutcome, StageStatus};
use crate::errors::PodflowResult;
use crate::slug::Slug;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Every stage succeeded or was skipped.
    Completed,
    /// A stage failed and the remaining stages were not attempted.
    Aborted,
    /// A stage failed but the operator let the run continue past it.
    CompletedWithFailures,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
            Self::CompletedWithFailures => write!(f, "completed with failures"),
        }
    }
}

/// What happened to one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// The stage.
    pub stage: StageName,
    /// Final status.
    pub status: StageStatus,
    /// Artifacts produced, or found fresh.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// Why the stage ran or was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The error message, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Wall-clock time spent running the stage.
    pub duration_ms: u64,
}

impl StageReport {
    /// A stage that did not run.
    #[must_use]
    pub fn skipped(stage: StageName, reason: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            artifacts,
            reason: Some(reason.into()),
            error: None,
            error_kind: None,
            duration_ms: 0,
        }
    }

    /// A stage never reached because an earlier stage aborted the run.
    #[must_use]
    pub fn not_attempted(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::NotAttempted,
            artifacts: Vec::new(),
            reason: None,
            error: None,
            error_kind: None,
            duration_ms: 0,
        }
    }

    /// A stage that ran (or failed before it could run).
    #[must_use]
    pub fn from_outcome(stage: StageName, reason: Option<String>, outcome: StageOutcome, elapsed: Duration) -> Self {
        let status = outcome.status();
        let (artifacts, error, error_kind) = match outcome {
            StageOutcome::Succeeded(artifacts) => (artifacts, None, None),
            StageOutcome::Failed(err) => (Vec::new(), Some(err.to_string()), Some(err.kind().to_string())),
        };
        Self {
            stage,
            status,
            artifacts,
            reason,
            error,
            error_kind,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// The sole externally observable result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// The run ID.
    pub run_id: Uuid,
    /// The topic.
    pub topic: String,
    /// The output slug.
    pub slug: Slug,
    /// Terminal state.
    pub state: PipelineState,
    /// Per-stage results in execution order.
    pub stages: Vec<StageReport>,
    /// Every artifact path, computed before any stage ran.
    pub expected: BTreeMap<ArtifactKind, PathBuf>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    /// Returns true if the run completed without failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// Process exit code for the run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// The report for one stage.
    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Status of one stage, `Pending` if the graph did not contain it.
    #[must_use]
    pub fn status_of(&self, stage: StageName) -> StageStatus {
        self.stage(stage).map_or(StageStatus::Pending, |r| r.status)
    }

    /// Every failed stage.
    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|r| r.status.is_failure())
    }

    /// The first failed stage.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageReport> {
        self.failures().next()
    }

    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> PodflowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {} for {:?} ({}): {}", self.run_id, self.topic, self.slug, self.state)?;
        for report in &self.stages {
            write!(f, "  {:<10} {:<14}", report.stage.as_str(), report.status.to_string())?;
            if let Some(error) = &report.error {
                write!(f, " {error}")?;
            } else if !report.artifacts.is_empty() {
                let paths: Vec<String> = report.artifacts.iter().map(|a| a.path.display().to_string()).collect();
                write!(f, " {}", paths.join(", "))?;
            } else if let Some(reason) = &report.reason {
                write!(f, " ({reason})")?;
            }
            if report.duration_ms > 0 {
                write!(f, " [{} ms]", report.duration_ms)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PodflowError;
    use crate::slug::resolve;
    use pretty_assertions::assert_eq;

    fn report(state: PipelineState, stages: Vec<StageReport>) -> PipelineReport {
        let now = Utc::now();
        PipelineReport {
            run_id: Uuid::nil(),
            topic: "El Universo".into(),
            slug: resolve("El Universo").unwrap(),
            state,
            stages,
            expected: BTreeMap::new(),
            started_at: now,
            finished_at: now,
        }
    }

    fn audio_failure() -> StageReport {
        StageReport::from_outcome(
            StageName::Audio,
            Some("forced".into()),
            StageOutcome::failed(PodflowError::StageExecution {
                stage: StageName::Audio,
                status: "exit status: 1".into(),
                message: "Falta OPENAI_API_KEY para TTS.".into(),
            }),
            Duration::from_millis(12),
        )
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(report(PipelineState::Completed, vec![]).exit_code(), 0);
        assert_eq!(report(PipelineState::Aborted, vec![]).exit_code(), 1);
        assert_eq!(report(PipelineState::CompletedWithFailures, vec![]).exit_code(), 1);
    }

    #[test]
    fn test_failed_stage_keeps_message_verbatim() {
        let r = report(
            PipelineState::Aborted,
            vec![
                StageReport::skipped(StageName::Script, "up to date", vec![]),
                audio_failure(),
                StageReport::not_attempted(StageName::Subtitles),
            ],
        );

        let failure = r.first_failure().unwrap();
        assert_eq!(failure.stage, StageName::Audio);
        assert_eq!(failure.error_kind.as_deref(), Some("stage_execution"));
        assert!(failure.error.as_deref().unwrap().contains("Falta OPENAI_API_KEY para TTS."));
        assert_eq!(failure.duration_ms, 12);
        assert_eq!(r.status_of(StageName::Subtitles), StageStatus::NotAttempted);
        assert_eq!(r.status_of(StageName::Video), StageStatus::Pending);
    }

    #[test]
    fn test_json_shape() {
        let r = report(PipelineState::Aborted, vec![audio_failure(), StageReport::not_attempted(StageName::Video)]);
        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();

        assert_eq!(json["state"], "aborted");
        assert_eq!(json["slug"], "el-universo");
        assert_eq!(json["stages"][0]["stage"], "audio");
        assert_eq!(json["stages"][0]["status"], "failed");
        assert_eq!(json["stages"][1]["status"], "not_attempted");
        assert!(json["stages"][1].get("error").is_none());
    }

    #[test]
    fn test_display_names_the_failing_stage() {
        let text = report(PipelineState::Aborted, vec![audio_failure()]).to_string();
        assert!(text.contains("aborted"));
        assert!(text.contains("audio"));
        assert!(text.contains("Falta OPENAI_API_KEY para TTS."));
    }
}
