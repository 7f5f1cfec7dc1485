//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications with declared inputs and outputs
//! - Pipeline builder with validation
//! - The fixed podcast stage graph
//! - A sequential driver that skips fresh stages and stops at failures
//! - Run reports

mod builder;
mod driver;
mod flags;
mod graph;
mod report;
mod spec;

pub use builder::PipelineBuilder;
pub use driver::Pipeline;
pub use flags::RunFlags;
pub use graph::{StageGraph, PODCAST_PIPELINE};
pub use report::{PipelineReport, PipelineState, StageReport};
pub use spec::{Precondition, StageSpec};
