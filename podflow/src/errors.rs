//! Error types for the podflow pipeline.
//!
//! Every variant of [`PodflowError`] is fatal to the current pipeline run.
//! The only sanctioned recovery is an explicit operator override
//! (`--from-stage`, `--continue-past`), never an automatic retry.

use crate::core::StageName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type PodflowResult<T> = Result<T, PodflowError>;

/// The main error type for podflow operations.
#[derive(Debug, Error)]
pub enum PodflowError {
    /// The topic normalizes to an empty slug.
    #[error("Invalid topic {topic:?}: it does not contain any slug characters")]
    InvalidTopic {
        /// The offending topic text.
        topic: String,
    },

    /// A static asset or input artifact required by a stage is absent.
    #[error("Stage '{stage}' is missing its {what}: {}", path.display())]
    MissingPrecondition {
        /// The stage that could not start.
        stage: StageName,
        /// Human description of the precondition ("background image", "input artifact").
        what: String,
        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// An external tool exited unsuccessfully.
    #[error("Stage '{stage}' failed ({status}): {message}")]
    StageExecution {
        /// The failing stage.
        stage: StageName,
        /// The tool's termination status, verbatim.
        status: String,
        /// The tool's diagnostic output, verbatim.
        message: String,
    },

    /// An external tool exited successfully without producing a declared output.
    #[error("Stage '{stage}' exited successfully but did not produce {}", expected_path.display())]
    MissingOutput {
        /// The stage whose contract was violated.
        stage: StageName,
        /// The output that is absent or empty.
        expected_path: PathBuf,
    },

    /// A required configuration value is absent and has no default.
    #[error("Cannot resolve configuration key '{key}': {reason}")]
    ConfigResolution {
        /// The configuration key or template placeholder.
        key: String,
        /// Why the value could not be resolved.
        reason: String,
    },

    /// The stage graph definition is invalid.
    #[error("{0}")]
    GraphValidation(#[from] PipelineValidationError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PodflowError {
    /// Creates a config resolution error.
    #[must_use]
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigResolution {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing precondition error.
    #[must_use]
    pub fn missing_precondition(
        stage: StageName,
        what: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::MissingPrecondition {
            stage,
            what: what.into(),
            path: path.into(),
        }
    }

    /// Stable machine-readable identifier of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTopic { .. } => "invalid_topic",
            Self::MissingPrecondition { .. } => "missing_precondition",
            Self::StageExecution { .. } => "stage_execution",
            Self::MissingOutput { .. } => "missing_output",
            Self::ConfigResolution { .. } => "config_resolution",
            Self::GraphValidation(_) => "graph_validation",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Returns the stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::MissingPrecondition { stage, .. }
            | Self::StageExecution { stage, .. }
            | Self::MissingOutput { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PodflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Metadata about a graph contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-GRAPH-EMPTY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when stage graph validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<StageName>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StageName>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}
