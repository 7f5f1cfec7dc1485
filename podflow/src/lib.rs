//! # Podflow
//!
//! A staged media pipeline that turns a topic into a narrated podcast video.
//!
//! Podflow drives four stages, each backed by an external tool:
//!
//! - **Script**: writes a two-speaker dialogue about the topic
//! - **Audio**: synthesizes the dialogue into speech
//! - **Subtitles**: times the speech into SRT and styled ASS subtitles
//! - **Video**: muxes a still background, the audio and the subtitles
//!
//! Every artifact lives at a deterministic path derived from the topic's
//! slug, and a stage whose outputs are newer than its inputs is skipped, so
//! re-running after a failure resumes where the last run stopped.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use podflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = PodcastConfig::from_path("config.json")?;
//! let ctx = RunContext::resolve(&config)?;
//! let graph = StageGraph::podcast(&ctx)?;
//!
//! let report = Pipeline::new(graph, Arc::new(ProcessRunner::new()))
//!     .with_event_sink(Arc::new(LoggingEventSink::default()))
//!     .run(&ctx, &RunFlags::new())
//!     .await;
//! std::process::exit(report.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod freshness;
pub mod naming;
pub mod pipeline;
pub mod runner;
pub mod slug;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PodcastConfig, SubtitleStrategy, VideoOptions};
    pub use crate::context::{RunContext, RunIdentity};
    pub use crate::core::{Artifact, ArtifactKind, StageName, StageOutcome, StageStatus};
    pub use crate::errors::{ContractErrorInfo, PipelineValidationError, PodflowError, PodflowResult};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::freshness::{Freshness, StaleReason};
    pub use crate::naming::ArtifactNamer;
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineReport, PipelineState, RunFlags, StageGraph, StageReport,
        StageSpec,
    };
    pub use crate::runner::{CommandTemplate, ProcessRunner, StageRunner};
    pub use crate::slug::Slug;
}
