//! Core domain model types for podflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identity and lifecycle status
//! - Artifact kinds and produced-artifact records
//! - Stage outcomes returned by runners

mod artifact;
mod outcome;
mod stage;
mod status;

pub use artifact::{Artifact, ArtifactKind};
pub use outcome::StageOutcome;
pub use stage::{StageName, UnknownStageError};
pub use status::StageStatus;
