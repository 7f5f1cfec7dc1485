//! The stage graph.

use super::{PipelineBuilder, StageSpec};
use crate::config::SubtitleStrategy;
use crate::context::RunContext;
use crate::core::{ArtifactKind, StageName};
use crate::errors::PodflowResult;

/// Name of the standard four-stage graph.
pub const PODCAST_PIPELINE: &str = "podcast";

/// Stages in execution order. Build through [`PipelineBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageGraph {
    name: String,
    stages: Vec<StageSpec>,
}

impl StageGraph {
    pub(super) fn new(name: String, stages: Vec<StageSpec>) -> Self {
        Self { name, stages }
    }

    /// The standard Script → Audio → Subtitles → Video graph for a run.
    ///
    /// With the `asr` subtitle strategy the Subtitles stage reads the audio
    /// and the script (for speaker styling); with `timeline` the Audio stage
    /// also writes the synthesizer's timeline file and Subtitles reads it. The Video stage needs the
    /// background image as a static precondition.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if a stage's commands cannot be resolved,
    /// or `GraphValidation` if the graph is malformed.
    pub fn podcast(ctx: &RunContext) -> PodflowResult<Self> {
        let script = StageSpec::new(StageName::Script)
            .with_output(ArtifactKind::Script)
            .with_commands(ctx.commands_for(StageName::Script)?);

        let audio = StageSpec::new(StageName::Audio)
            .with_input(ArtifactKind::Script)
            .with_output(ArtifactKind::Audio);
        let audio = match ctx.strategy() {
            SubtitleStrategy::Asr => audio,
            SubtitleStrategy::Timeline => audio.with_output(ArtifactKind::Timeline),
        }
        .with_commands(ctx.commands_for(StageName::Audio)?);

        let subtitles = StageSpec::new(StageName::Subtitles).with_input(ArtifactKind::Audio);
        let subtitles = match ctx.strategy() {
            SubtitleStrategy::Asr => subtitles.with_input(ArtifactKind::Script),
            SubtitleStrategy::Timeline => subtitles.with_input(ArtifactKind::Timeline),
        }
        .with_output(ArtifactKind::Subtitles)
        .with_output(ArtifactKind::StyledSubtitles)
        .with_commands(ctx.commands_for(StageName::Subtitles)?);

        let video = StageSpec::new(StageName::Video)
            .with_input(ArtifactKind::Audio)
            .with_input(ArtifactKind::Subtitles)
            .with_precondition("background image", ctx.image())
            .with_output(ArtifactKind::Video)
            .with_commands(ctx.commands_for(StageName::Video)?);

        Ok(PipelineBuilder::new(PODCAST_PIPELINE)
            .stage(script)?
            .stage(audio)?
            .stage(subtitles)?
            .stage(video)?
            .build()?)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Looks a stage up by name.
    #[must_use]
    pub fn stage(&self, name: StageName) -> Option<&StageSpec> {
        self.stages.iter().find(|spec| spec.name == name)
    }

    /// Returns the execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<StageName> {
        self.stages.iter().map(|spec| spec.name).collect()
    }
}
