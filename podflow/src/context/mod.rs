//! Run context management.
//!
//! This module provides:
//! - Run identity (run ID and start time)
//! - The resolved, immutable per-run context shared by graph, driver and runner

mod identity;
mod run;

pub use identity::RunIdentity;
pub use run::RunContext;
