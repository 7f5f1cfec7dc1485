//! Result of running a single stage.

use super::{Artifact, StageStatus};
use crate::errors::PodflowError;

/// The outcome of executing one stage through a runner.
#[derive(Debug)]
pub enum StageOutcome {
    /// The tool succeeded and every declared output is in place.
    Succeeded(Vec<Artifact>),
    /// The stage failed; the error carries the tool's status verbatim.
    Failed(PodflowError),
}

impl StageOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn succeeded(artifacts: Vec<Artifact>) -> Self {
        Self::Succeeded(artifacts)
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error: PodflowError) -> Self {
        Self::Failed(error)
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Maps the outcome onto the stage lifecycle.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Succeeded(_) => StageStatus::Succeeded,
            Self::Failed(_) => StageStatus::Failed,
        }
    }

    /// Artifacts produced by a successful stage (empty on failure).
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Self::Succeeded(artifacts) => artifacts,
            Self::Failed(_) => &[],
        }
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&PodflowError> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl From<Result<Vec<Artifact>, PodflowError>> for StageOutcome {
    fn from(result: Result<Vec<Artifact>, PodflowError>) -> Self {
        match result {
            Ok(artifacts) => Self::Succeeded(artifacts),
            Err(err) => Self::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, StageName};

    #[test]
    fn test_succeeded_outcome() {
        let outcome = StageOutcome::succeeded(vec![Artifact::new(ArtifactKind::Audio, "a.wav")]);
        assert!(outcome.is_success());
        assert_eq!(outcome.status(), StageStatus::Succeeded);
        assert_eq!(outcome.artifacts().len(), 1);
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_failed_outcome_from_result() {
        let outcome: StageOutcome = Err(PodflowError::MissingOutput {
            stage: StageName::Audio,
            expected_path: "a.wav".into(),
        })
        .into();
        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), StageStatus::Failed);
        assert!(outcome.artifacts().is_empty());
        assert_eq!(outcome.error().map(PodflowError::kind), Some("missing_output"));
    }
}
