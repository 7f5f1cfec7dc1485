//! Testing utilities for podflow pipelines.
//!
//! This module provides:
//! - A recording runner that fakes external tools
//! - A workspace fixture with config, assets and outputs
//! - Assertions over pipeline reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_aborted_at, assert_all_skipped, assert_completed, assert_stage_status};
pub use fixtures::TestWorkspace;
pub use mocks::RecordingRunner;
