//! Stage runners.
//!
//! A runner executes one stage's command contract and reports a
//! [`StageOutcome`]. The pipeline driver only talks to the [`StageRunner`]
//! trait, so tests substitute a fake that never spawns anything.

mod command;
mod defaults;
mod process;
mod staging;

pub use command::{CommandTemplate, TemplateVars};
pub use defaults::{default_commands, escape_filter_path, force_style, video_command, FFMPEG, PYTHON};
pub use process::ProcessRunner;
pub use staging::{is_staging_path, promote_all, staging_path, StagedOutput};

use crate::context::RunContext;
use crate::core::StageOutcome;
use crate::pipeline::StageSpec;
use async_trait::async_trait;

/// Executes a single stage.
///
/// Implementations must not retry: a failure is reported once and the
/// driver decides what happens next.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Runs `stage` within `ctx`.
    async fn run(&self, stage: &StageSpec, ctx: &RunContext) -> StageOutcome;
}
