//! Pipeline builder with validation.

use super::{StageGraph, StageSpec};
use crate::errors::{ContractErrorInfo, PipelineValidationError};

/// Builder for creating validated stage graphs.
///
/// Stages are added in execution order. Because every input must be
/// produced by a stage added earlier, insertion order is always a valid
/// topological order and cycles cannot be expressed.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (duplicate stage, unproduced
    /// input, invalid contract).
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage with a specification.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.iter().any(|existing| existing.name == spec.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is defined twice",
                spec.name
            ))
            .with_stages(vec![spec.name])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-GRAPH-DUPLICATE", format!("Duplicate stage '{}'", spec.name))
                    .with_fix_hint("Each stage may appear only once in a pipeline."),
            ));
        }

        for input in &spec.inputs {
            let producer = input.producer();
            if !self.stages.iter().any(|earlier| earlier.outputs.contains(input)) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' reads '{}' but no earlier stage declares it (expected producer: '{}')",
                    spec.name, input, producer
                ))
                .with_stages(vec![spec.name, producer])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-GRAPH-UNPRODUCED_INPUT",
                        format!("Input '{input}' has no earlier producer"),
                    )
                    .with_fix_hint("Add the producing stage, declaring the artifact as an output, before the stage that reads it.")
                    .with_context_entry("artifact", input.to_string()),
                ));
            }
        }

        self.stages.push(spec);
        Ok(())
    }

    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(self) -> Result<StageGraph, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new("Pipeline has no stages").with_error_info(
                ContractErrorInfo::new("CONTRACT-GRAPH-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }

        Ok(StageGraph::new(self.name, self.stages))
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, StageName};

    fn script() -> StageSpec {
        StageSpec::new(StageName::Script).with_output(ArtifactKind::Script)
    }

    fn audio() -> StageSpec {
        StageSpec::new(StageName::Audio)
            .with_input(ArtifactKind::Script)
            .with_output(ArtifactKind::Audio)
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_builder_with_dependencies() {
        let builder = PipelineBuilder::new("test").stage(script()).unwrap().stage(audio()).unwrap();
        assert_eq!(builder.stage_count(), 2);
    }

    #[test]
    fn test_builder_unproduced_input() {
        let err = PipelineBuilder::new("test").stage(audio()).unwrap_err();
        assert_eq!(err.stages, vec![StageName::Audio, StageName::Script]);
        assert_eq!(err.error_info.unwrap().code, "CONTRACT-GRAPH-UNPRODUCED_INPUT");
    }

    #[test]
    fn test_builder_duplicate_stage() {
        let err = PipelineBuilder::new("test")
            .stage(script())
            .unwrap()
            .stage(script())
            .unwrap_err();
        assert_eq!(err.error_info.unwrap().code, "CONTRACT-GRAPH-DUPLICATE");
    }

    #[test]
    fn test_builder_empty_build() {
        let err = PipelineBuilder::new("test").build().unwrap_err();
        assert_eq!(err.error_info.unwrap().code, "CONTRACT-GRAPH-EMPTY");
    }

    #[test]
    fn test_input_must_be_declared_by_an_earlier_stage() {
        let subtitles = || {
            StageSpec::new(StageName::Subtitles)
                .with_input(ArtifactKind::Timeline)
                .with_output(ArtifactKind::Subtitles)
        };

        let err = PipelineBuilder::new("test")
            .stage(script())
            .unwrap()
            .stage(audio())
            .unwrap()
            .stage(subtitles())
            .unwrap_err();
        let info = err.error_info.unwrap();
        assert_eq!(info.code, "CONTRACT-GRAPH-UNPRODUCED_INPUT");
        assert_eq!(info.context.get("artifact").map(String::as_str), Some("timeline"));

        let graph = PipelineBuilder::new("test")
            .stage(script())
            .unwrap()
            .stage(audio().with_output(ArtifactKind::Timeline))
            .unwrap()
            .stage(subtitles())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(graph.stage_count(), 3);
    }
}
