//! Sequential pipeline driver.

use super::{PipelineReport, PipelineState, RunFlags, StageGraph, StageReport, StageSpec};
use crate::context::RunContext;
use crate::core::{Artifact, StageOutcome};
use crate::events::{
    EventSink, NoOpEventSink, PIPELINE_ABORTED, PIPELINE_COMPLETED, PIPELINE_STARTED, STAGE_FAILED,
    STAGE_SKIPPED, STAGE_STARTED, STAGE_SUCCEEDED,
};
use crate::errors::PodflowResult;
use crate::freshness::{self, Freshness, StaleReason};
use crate::runner::StageRunner;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};

const UP_TO_DATE: &str = "up to date";
const NOT_SELECTED: &str = "not selected";

/// Walks a [`StageGraph`] in order, deciding per stage whether to skip or
/// run it, and stops at the first failure.
pub struct Pipeline {
    graph: StageGraph,
    runner: Arc<dyn StageRunner>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("graph", &self.graph).finish_non_exhaustive()
    }
}

/// What the driver decided for a stage before running anything.
enum Decision {
    Skip(String, Vec<Artifact>),
    Run(StaleReason),
}

impl Pipeline {
    /// Creates a pipeline that discards events.
    #[must_use]
    pub fn new(graph: StageGraph, runner: Arc<dyn StageRunner>) -> Self {
        Self {
            graph,
            runner,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The graph being driven.
    #[must_use]
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// Runs the graph once.
    ///
    /// Never returns an error: every failure is recorded against the stage
    /// it happened in and reflected in the report's state.
    pub async fn run(&self, ctx: &RunContext, flags: &RunFlags) -> PipelineReport {
        let span = info_span!("pipeline", run_id = %ctx.run_id(), slug = %ctx.slug());
        self.run_inner(ctx, flags).instrument(span).await
    }

    async fn run_inner(&self, ctx: &RunContext, flags: &RunFlags) -> PipelineReport {
        let expected = ctx.expected_paths();
        let started_at = Utc::now();

        info!(topic = ctx.topic(), stages = self.graph.stage_count(), "pipeline started");
        self.sink
            .emit(
                PIPELINE_STARTED,
                Some(json!({
                    "run_id": ctx.run_id(),
                    "topic": ctx.topic(),
                    "slug": ctx.slug(),
                    "expected": to_json_value(&expected),
                })),
            )
            .await;

        let mut reports = Vec::with_capacity(self.graph.stage_count());
        let mut aborted = false;
        let mut resumed = flags.from_stage.is_none();

        for spec in self.graph.stages() {
            if aborted {
                reports.push(StageReport::not_attempted(spec.name));
                continue;
            }
            if !resumed && flags.from_stage == Some(spec.name) {
                resumed = true;
            }

            let decision = if resumed {
                Self::decide(spec, ctx, flags)
            } else {
                Ok(Decision::Skip(
                    format!("before resume stage {}", flags.from_stage.map_or("", |s| s.as_str())),
                    existing_artifacts(spec, ctx),
                ))
            };

            let report = match decision {
                Ok(Decision::Skip(reason, artifacts)) => {
                    info!(stage = %spec.name, reason = %reason, "stage skipped");
                    self.sink
                        .emit(STAGE_SKIPPED, Some(json!({"stage": spec.name, "reason": &reason})))
                        .await;
                    StageReport::skipped(spec.name, reason, artifacts)
                }
                Ok(Decision::Run(reason)) => self.run_stage(spec, ctx, reason).await,
                Err(err) => {
                    let report =
                        StageReport::from_outcome(spec.name, None, StageOutcome::failed(err), Duration::ZERO);
                    self.report_failure(&report).await;
                    report
                }
            };

            if report.status.is_failure() && !flags.continue_past.contains(&spec.name) {
                aborted = true;
            }
            reports.push(report);
        }

        let has_failures = reports.iter().any(|r| r.status.is_failure());
        let state = match (aborted, has_failures) {
            (true, _) => PipelineState::Aborted,
            (false, true) => PipelineState::CompletedWithFailures,
            (false, false) => PipelineState::Completed,
        };

        let report = PipelineReport {
            run_id: ctx.run_id(),
            topic: ctx.topic().to_string(),
            slug: ctx.slug().clone(),
            state,
            stages: reports,
            expected,
            started_at,
            finished_at: Utc::now(),
        };

        let event = if aborted { PIPELINE_ABORTED } else { PIPELINE_COMPLETED };
        let failed_stage = report.first_failure().map(|r| r.stage);
        info!(state = %state, "pipeline finished");
        self.sink
            .emit(
                event,
                Some(json!({"run_id": report.run_id, "state": state, "failed_stage": failed_stage})),
            )
            .await;

        report
    }

    fn decide(spec: &StageSpec, ctx: &RunContext, flags: &RunFlags) -> PodflowResult<Decision> {
        if !flags.is_selected(spec.name) {
            return Ok(Decision::Skip(NOT_SELECTED.to_string(), existing_artifacts(spec, ctx)));
        }
        if flags.is_forced(spec.name) {
            return Ok(Decision::Run(StaleReason::Forced));
        }

        let outputs = spec.output_paths(ctx);
        match freshness::assess(&outputs, &spec.freshness_inputs(ctx))? {
            Freshness::Fresh => {
                let artifacts = spec
                    .outputs
                    .iter()
                    .zip(outputs)
                    .map(|(kind, path)| Artifact::new(*kind, path))
                    .collect();
                Ok(Decision::Skip(UP_TO_DATE.to_string(), artifacts))
            }
            Freshness::Stale(reason) => Ok(Decision::Run(reason)),
        }
    }

    async fn run_stage(&self, spec: &StageSpec, ctx: &RunContext, reason: StaleReason) -> StageReport {
        info!(stage = %spec.name, reason = %reason, "stage started");
        self.sink
            .emit(STAGE_STARTED, Some(json!({"stage": spec.name, "reason": reason.to_string()})))
            .await;

        let started = Instant::now();
        let outcome = self.runner.run(spec, ctx).await;
        let report = StageReport::from_outcome(spec.name, Some(reason.to_string()), outcome, started.elapsed());

        if report.status.is_failure() {
            self.report_failure(&report).await;
        } else {
            info!(stage = %spec.name, duration_ms = report.duration_ms, "stage succeeded");
            self.sink
                .emit(
                    STAGE_SUCCEEDED,
                    Some(json!({
                        "stage": spec.name,
                        "artifacts": to_json_value(&report.artifacts),
                        "duration_ms": report.duration_ms,
                    })),
                )
                .await;
        }
        report
    }

    async fn report_failure(&self, report: &StageReport) {
        error!(
            stage = %report.stage,
            kind = report.error_kind.as_deref().unwrap_or_default(),
            error = report.error.as_deref().unwrap_or_default(),
            "stage failed"
        );
        self.sink
            .emit(
                STAGE_FAILED,
                Some(json!({
                    "stage": report.stage,
                    "kind": &report.error_kind,
                    "error": &report.error,
                })),
            )
            .await;
    }
}

/// Event payload fragment; paths that are not valid UTF-8 degrade to null.
/// Declared outputs of `spec` already on disk, for stages skipped without
/// a freshness check.
fn existing_artifacts(spec: &StageSpec, ctx: &RunContext) -> Vec<Artifact> {
    spec.outputs
        .iter()
        .zip(spec.output_paths(ctx))
        .filter(|(_, path)| path.is_file())
        .map(|(kind, path)| Artifact::new(*kind, path))
        .collect()
}

fn to_json_value<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}
