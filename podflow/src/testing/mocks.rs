//! Fake runners for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;

use crate::context::RunContext;
use crate::core::{Artifact, StageName, StageOutcome};
use crate::errors::{PodflowError, PodflowResult};
use crate::pipeline::StageSpec;
use crate::runner::StageRunner;

/// A runner that records invocations and writes placeholder outputs
/// instead of spawning tools.
///
/// It enforces the same contract as the process runner: preconditions and
/// inputs must exist, and every declared output is written before the stage
/// reports success.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<StageName>>,
    failures: Mutex<BTreeMap<StageName, String>>,
}

impl RecordingRunner {
    /// Creates a runner where every stage succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `stage` fail with `message` as its diagnostic output.
    #[must_use]
    pub fn failing_on(self, stage: StageName, message: impl Into<String>) -> Self {
        self.fail_on(stage, message);
        self
    }

    /// Makes `stage` fail from now on.
    pub fn fail_on(&self, stage: StageName, message: impl Into<String>) {
        self.failures.lock().insert(stage, message.into());
    }

    /// Lets every stage succeed again.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Stages invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StageName> {
        self.calls.lock().clone()
    }

    /// Total number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of invocations of `stage`.
    #[must_use]
    pub fn calls_for(&self, stage: StageName) -> usize {
        self.calls.lock().iter().filter(|s| **s == stage).count()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn produce(stage: &StageSpec, ctx: &RunContext) -> PodflowResult<Vec<Artifact>> {
        for precondition in &stage.preconditions {
            if !precondition.path.is_file() {
                return Err(PodflowError::missing_precondition(
                    stage.name,
                    precondition.what.clone(),
                    &precondition.path,
                ));
            }
        }
        for kind in &stage.inputs {
            let path = ctx.path_for(*kind);
            if !path.is_file() {
                return Err(PodflowError::missing_precondition(stage.name, format!("input {kind}"), path));
            }
        }

        stage
            .outputs
            .iter()
            .map(|kind| {
                let path = ctx.path_for(*kind);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, format!("{} for {}\n", kind, ctx.topic()))?;
                Ok(Artifact::new(*kind, path))
            })
            .collect()
    }
}

#[async_trait]
impl StageRunner for RecordingRunner {
    async fn run(&self, stage: &StageSpec, ctx: &RunContext) -> StageOutcome {
        self.calls.lock().push(stage.name);

        let failure = self.failures.lock().get(&stage.name).cloned();
        if let Some(message) = failure {
            return StageOutcome::failed(PodflowError::StageExecution {
                stage: stage.name,
                status: "exit status: 1".to_string(),
                message,
            });
        }

        StageOutcome::from(Self::produce(stage, ctx))
    }
}
