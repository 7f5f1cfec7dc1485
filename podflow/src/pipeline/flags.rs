//! Operator overrides for a run.

use crate::core::StageName;
use std::collections::BTreeSet;

/// Per-run overrides of the default walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// Resume at this stage: earlier stages are skipped without a freshness
    /// check and this stage runs regardless of freshness.
    pub from_stage: Option<StageName>,
    /// Stages that run regardless of freshness.
    pub force: BTreeSet<StageName>,
    /// Restrict the run to these stages; `None` selects all.
    pub only: Option<BTreeSet<StageName>>,
    /// Stages whose failure does not abort the run.
    pub continue_past: BTreeSet<StageName>,
}

impl RunFlags {
    /// Default flags: every stage, freshness decides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags for running a single stage.
    #[must_use]
    pub fn single(stage: StageName) -> Self {
        Self {
            only: Some(BTreeSet::from([stage])),
            ..Self::default()
        }
    }

    /// Resumes at `stage`.
    #[must_use]
    pub fn from_stage(mut self, stage: StageName) -> Self {
        self.from_stage = Some(stage);
        self
    }

    /// Forces `stage` to run.
    #[must_use]
    pub fn force(mut self, stage: StageName) -> Self {
        self.force.insert(stage);
        self
    }

    /// Forces every stage to run.
    #[must_use]
    pub fn force_all(mut self) -> Self {
        self.force.extend(StageName::ALL);
        self
    }

    /// Lets the run continue when `stage` fails.
    #[must_use]
    pub fn continue_past(mut self, stage: StageName) -> Self {
        self.continue_past.insert(stage);
        self
    }

    /// Returns true if `stage` takes part in the run.
    #[must_use]
    pub fn is_selected(&self, stage: StageName) -> bool {
        self.only.as_ref().map_or(true, |only| only.contains(&stage))
    }

    /// Returns true if `stage` skips the freshness check.
    #[must_use]
    pub fn is_forced(&self, stage: StageName) -> bool {
        self.force.contains(&stage) || self.from_stage == Some(stage)
    }
}
