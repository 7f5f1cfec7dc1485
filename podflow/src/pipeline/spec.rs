//! Stage specifications.

use crate::context::RunContext;
use crate::core::{ArtifactKind, StageName};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::runner::CommandTemplate;
use std::path::PathBuf;

/// A static file a stage needs that no stage produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    /// Human description ("background image").
    pub what: String,
    /// Where the file must exist.
    pub path: PathBuf,
}

/// Specification for a single stage: its artifact contract and the commands
/// fulfilling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// The stage name.
    pub name: StageName,
    /// Artifacts the stage reads.
    pub inputs: Vec<ArtifactKind>,
    /// Artifacts the stage must produce.
    pub outputs: Vec<ArtifactKind>,
    /// Static files that must exist before the stage starts.
    pub preconditions: Vec<Precondition>,
    /// Commands run in order.
    pub commands: Vec<CommandTemplate>,
}

impl StageSpec {
    /// Creates a new stage specification with no contract.
    #[must_use]
    pub fn new(name: StageName) -> Self {
        Self {
            name,
            inputs: Vec::new(),
            outputs: Vec::new(),
            preconditions: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Adds an input artifact.
    #[must_use]
    pub fn with_input(mut self, kind: ArtifactKind) -> Self {
        if !self.inputs.contains(&kind) {
            self.inputs.push(kind);
        }
        self
    }

    /// Adds an output artifact.
    #[must_use]
    pub fn with_output(mut self, kind: ArtifactKind) -> Self {
        if !self.outputs.contains(&kind) {
            self.outputs.push(kind);
        }
        self
    }

    /// Adds a static precondition.
    #[must_use]
    pub fn with_precondition(mut self, what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.preconditions.push(Precondition {
            what: what.into(),
            path: path.into(),
        });
        self
    }

    /// Appends a command.
    #[must_use]
    pub fn with_command(mut self, command: CommandTemplate) -> Self {
        self.commands.push(command);
        self
    }

    /// Appends several commands.
    #[must_use]
    pub fn with_commands(mut self, commands: impl IntoIterator<Item = CommandTemplate>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Final paths of the declared outputs.
    #[must_use]
    pub fn output_paths(&self, ctx: &RunContext) -> Vec<PathBuf> {
        self.outputs.iter().map(|kind| ctx.path_for(*kind)).collect()
    }

    /// Paths whose modification times gate the stage: the declared inputs
    /// followed by the static preconditions.
    #[must_use]
    pub fn freshness_inputs(&self, ctx: &RunContext) -> Vec<PathBuf> {
        self.inputs
            .iter()
            .map(|kind| ctx.path_for(*kind))
            .chain(self.preconditions.iter().map(|p| p.path.clone()))
            .collect()
    }

    /// Validates the stage's own contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage declares no outputs, declares an output
    /// another stage owns, or reads one of its own outputs.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.outputs.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' declares no outputs",
                self.name
            ))
            .with_stages(vec![self.name])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-STAGE-NO_OUTPUTS", "A stage must produce at least one artifact")
                    .with_fix_hint("Declare the artifacts the stage's commands write."),
            ));
        }

        if let Some(foreign) = self.outputs.iter().find(|kind| kind.producer() != self.name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' declares output '{}' owned by stage '{}'",
                self.name,
                foreign,
                foreign.producer()
            ))
            .with_stages(vec![self.name, foreign.producer()])
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-STAGE-FOREIGN_OUTPUT", "Each artifact kind has exactly one producer")
                    .with_context_entry("artifact", foreign.to_string()),
            ));
        }

        if let Some(own) = self.inputs.iter().find(|kind| self.outputs.contains(kind)) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' cannot read its own output '{}'",
                self.name, own
            ))
            .with_stages(vec![self.name])
            .with_error_info(ContractErrorInfo::new(
                "CONTRACT-STAGE-SELF_INPUT",
                "A stage cannot depend on itself",
            )));
        }

        Ok(())
    }
}
