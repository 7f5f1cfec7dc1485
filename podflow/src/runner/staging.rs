//! Staging paths and atomic promotion of stage outputs.
//!
//! Tools write each declared output to `<stem>.partial.<ext>` next to its
//! final location. Only after every command of the stage succeeded are the
//! staged files renamed into place, so an interrupted run never leaves a
//! final-looking artifact behind.

use crate::core::{Artifact, ArtifactKind, StageName};
use crate::errors::{PodflowError, PodflowResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

const PARTIAL_MARKER: &str = "partial";

/// Staging location for a final artifact path.
///
/// `a/x.wav` stages at `a/x.partial.wav`; `a/x.timeline.json` at
/// `a/x.timeline.partial.json`.
#[must_use]
pub fn staging_path(final_path: &Path) -> PathBuf {
    let Some(file_name) = final_path.file_name().and_then(|n| n.to_str()) else {
        return final_path.with_extension(PARTIAL_MARKER);
    };
    let staged = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{PARTIAL_MARKER}.{ext}"),
        _ => format!("{file_name}.{PARTIAL_MARKER}"),
    };
    final_path.with_file_name(staged)
}

/// Returns true for files written by an unfinished stage.
#[must_use]
pub fn is_staging_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| {
            n.split('.')
                .skip(1)
                .any(|part| part == PARTIAL_MARKER)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: SystemTime,
}

fn stamp(path: &Path) -> io::Result<Option<FileStamp>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(FileStamp {
            len: meta.len(),
            modified: meta.modified()?,
        })),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// One declared output of a running stage.
#[derive(Debug, Clone)]
pub struct StagedOutput {
    kind: ArtifactKind,
    final_path: PathBuf,
    staging_path: PathBuf,
    before: Option<FileStamp>,
}

/// How a staged output reached its final path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    Rename,
    InPlace,
}

impl StagedOutput {
    /// Prepares an output slot: creates the parent directory, removes any
    /// leftover staging file and records the state of the final path.
    pub fn prepare(kind: ArtifactKind, final_path: impl Into<PathBuf>) -> io::Result<Self> {
        let final_path = final_path.into();
        let staging_path = staging_path(&final_path);
        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        remove_if_present(&staging_path)?;
        let before = stamp(&final_path)?;
        Ok(Self {
            kind,
            final_path,
            staging_path,
            before,
        })
    }

    /// The artifact kind.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Where the tool should write.
    #[must_use]
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Where the artifact ends up.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    fn landing(&self) -> io::Result<Option<Landing>> {
        if let Some(staged) = stamp(&self.staging_path)? {
            if staged.len > 0 {
                return Ok(Some(Landing::Rename));
            }
        }
        // Tools that ignore the staging path and write straight to the
        // final location are accepted when they visibly rewrote it.
        match stamp(&self.final_path)? {
            Some(now) if now.len > 0 && Some(now) != self.before => Ok(Some(Landing::InPlace)),
            _ => Ok(None),
        }
    }

    /// Drops the staging file, if any.
    pub fn discard(&self) {
        if let Err(err) = remove_if_present(&self.staging_path) {
            warn!(path = %self.staging_path.display(), error = %err, "could not remove staging file");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Verifies every output of `stage` and moves staged files into place.
///
/// Nothing is renamed unless every output is present, so a stage either
/// publishes all of its artifacts or none of them.
///
/// # Errors
///
/// Returns `MissingOutput` naming the first absent or empty output, or `Io`
/// if a rename fails.
pub fn promote_all(stage: StageName, outputs: &[StagedOutput]) -> PodflowResult<Vec<Artifact>> {
    let mut landings = Vec::with_capacity(outputs.len());
    for output in outputs {
        match output.landing()? {
            Some(landing) => landings.push((output, landing)),
            None => {
                outputs.iter().for_each(StagedOutput::discard);
                return Err(PodflowError::MissingOutput {
                    stage,
                    expected_path: output.final_path.clone(),
                });
            }
        }
    }

    let mut artifacts = Vec::with_capacity(landings.len());
    for (output, landing) in landings {
        if landing == Landing::Rename {
            fs::rename(&output.staging_path, &output.final_path)?;
            debug!(
                stage = %stage,
                from = %output.staging_path.display(),
                path = %output.final_path.display(),
                "promoted staged output"
            );
        } else {
            output.discard();
        }
        artifacts.push(Artifact::new(output.kind, output.final_path.clone()));
    }
    Ok(artifacts)
}
