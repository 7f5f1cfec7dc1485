//! Stage status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a stage within one pipeline run.
///
/// `Pending → Skipped` when the outputs are already fresh,
/// `Pending → Succeeded | Failed` once its tools ran. Stages never reached
/// because an earlier stage aborted the run stay `NotAttempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage is waiting for its turn.
    Pending,
    /// Stage outputs were already fresh, or the stage was forced past.
    Skipped,
    /// Stage ran and produced all declared outputs.
    Succeeded,
    /// Stage ran and failed.
    Failed,
    /// Stage was never reached because the run aborted earlier.
    NotAttempted,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::NotAttempted => write!(f, "not attempted"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::Succeeded | Self::Failed | Self::NotAttempted
        )
    }

    /// Returns true if the status lets downstream stages proceed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
        assert_eq!(StageStatus::NotAttempted.to_string(), "not attempted");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Succeeded.is_terminal());
        assert!(StageStatus::Skipped.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(StageStatus::NotAttempted.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
    }

    #[test]
    fn test_success_and_failure_are_disjoint() {
        assert!(StageStatus::Skipped.is_success());
        assert!(!StageStatus::Skipped.is_failure());
        assert!(StageStatus::Failed.is_failure());
        assert!(!StageStatus::NotAttempted.is_success());
        assert!(!StageStatus::NotAttempted.is_failure());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::NotAttempted).unwrap();
        assert_eq!(json, r#""not_attempted""#);

        let deserialized: StageStatus = serde_json::from_str(r#""skipped""#).unwrap();
        assert_eq!(deserialized, StageStatus::Skipped);
    }
}
