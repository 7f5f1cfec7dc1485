//! Event sink system for observability.
//!
//! The pipeline driver reports every lifecycle transition to an
//! [`EventSink`]. Event names are the constants below; payloads are JSON
//! objects that always carry the `stage` (stage events) or `run_id`
//! (pipeline events).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run started; payload carries the expected artifact paths.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// A run finished with every stage succeeded or skipped, or continued past
/// operator-allowed failures.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A run stopped at a failed stage.
pub const PIPELINE_ABORTED: &str = "pipeline.aborted";
/// A stage is about to run its tools.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage was skipped.
pub const STAGE_SKIPPED: &str = "stage.skipped";
/// A stage produced all of its outputs.
pub const STAGE_SUCCEEDED: &str = "stage.succeeded";
/// A stage failed.
pub const STAGE_FAILED: &str = "stage.failed";
