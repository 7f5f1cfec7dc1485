//! Staleness detection shared by every stage.
//!
//! A stage's outputs are fresh iff all of them exist, none is empty, and
//! none is older than any input. Zero-byte files count as missing so that a
//! truncated leftover from an interrupted run is rebuilt.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Why a stage must run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StaleReason {
    /// A declared output does not exist.
    MissingOutput {
        /// The absent output.
        path: PathBuf,
    },
    /// A declared output exists but is empty.
    EmptyOutput {
        /// The zero-byte output.
        path: PathBuf,
    },
    /// An input does not exist, so freshness cannot be established.
    MissingInput {
        /// The absent input.
        path: PathBuf,
    },
    /// An input was modified after an output.
    InputNewer {
        /// The newer input.
        input: PathBuf,
        /// The older output.
        output: PathBuf,
    },
    /// The operator asked for the stage to run regardless.
    Forced,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOutput { path } => write!(f, "output {} is missing", path.display()),
            Self::EmptyOutput { path } => write!(f, "output {} is empty", path.display()),
            Self::MissingInput { path } => write!(f, "input {} is missing", path.display()),
            Self::InputNewer { input, output } => write!(
                f,
                "input {} is newer than output {}",
                input.display(),
                output.display()
            ),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// Result of a freshness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// All outputs are present and up to date.
    Fresh,
    /// The stage must run.
    Stale(StaleReason),
}

impl Freshness {
    /// Returns true if the stage can be skipped.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Size and modification time of an existing file.
fn probe(path: &Path) -> io::Result<Option<(u64, SystemTime)>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some((meta.len(), meta.modified()?))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Applies the freshness rule to a stage's outputs and inputs.
///
/// # Errors
///
/// Returns an IO error if file metadata cannot be read for a reason other
/// than the file not existing.
pub fn assess<O, I>(outputs: &[O], inputs: &[I]) -> io::Result<Freshness>
where
    O: AsRef<Path>,
    I: AsRef<Path>,
{
    let mut output_times = Vec::with_capacity(outputs.len());
    for output in outputs {
        let output = output.as_ref();
        match probe(output)? {
            None => {
                return Ok(Freshness::Stale(StaleReason::MissingOutput {
                    path: output.to_path_buf(),
                }))
            }
            Some((0, _)) => {
                return Ok(Freshness::Stale(StaleReason::EmptyOutput {
                    path: output.to_path_buf(),
                }))
            }
            Some((_, modified)) => output_times.push((output, modified)),
        }
    }

    for input in inputs {
        let input = input.as_ref();
        let Some((_, input_modified)) = probe(input)? else {
            return Ok(Freshness::Stale(StaleReason::MissingInput {
                path: input.to_path_buf(),
            }));
        };
        if let Some((output, _)) = output_times
            .iter()
            .find(|(_, output_modified)| *output_modified < input_modified)
        {
            return Ok(Freshness::Stale(StaleReason::InputNewer {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            }));
        }
    }

    Ok(Freshness::Fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;

    fn write_at(path: &Path, contents: &str, modified: SystemTime) {
        fs::write(path, contents).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    #[test]
    fn test_output_newer_than_inputs_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let output = dir.path().join("a.wav");
        write_at(&input, "Héctor: hola", t(10));
        write_at(&output, "RIFF", t(20));

        assert_eq!(assess(&[&output], &[&input]).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn test_equal_timestamps_are_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let output = dir.path().join("a.wav");
        write_at(&input, "x", t(10));
        write_at(&output, "y", t(10));

        assert!(assess(&[&output], &[&input]).unwrap().is_fresh());
    }

    #[test]
    fn test_touching_input_makes_stage_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let output = dir.path().join("a.wav");
        write_at(&input, "x", t(10));
        write_at(&output, "y", t(20));
        assert!(assess(&[&output], &[&input]).unwrap().is_fresh());

        write_at(&input, "x2", t(30));
        assert_eq!(
            assess(&[&output], &[&input]).unwrap(),
            Freshness::Stale(StaleReason::InputNewer {
                input: input.clone(),
                output: output.clone(),
            })
        );
    }

    #[test]
    fn test_any_stale_output_makes_stage_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.wav");
        let srt = dir.path().join("a.srt");
        let ass = dir.path().join("a.ass");
        write_at(&input, "x", t(10));
        write_at(&srt, "1", t(20));
        write_at(&ass, "[Script Info]", t(5));

        let result = assess(&[&srt, &ass], &[&input]).unwrap();
        assert!(matches!(result, Freshness::Stale(StaleReason::InputNewer { output, .. }) if output == ass));
    }

    #[test]
    fn test_missing_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing.mp4");
        let inputs: [&Path; 0] = [];
        assert_eq!(
            assess(&[&output], &inputs).unwrap(),
            Freshness::Stale(StaleReason::MissingOutput { path: output })
        );
    }

    #[test]
    fn test_empty_output_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("truncated.wav");
        write_at(&output, "", t(50));
        let inputs: [&Path; 0] = [];
        assert_eq!(
            assess(&[&output], &inputs).unwrap(),
            Freshness::Stale(StaleReason::EmptyOutput { path: output })
        );
    }

    #[test]
    fn test_missing_input_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gone.txt");
        let output = dir.path().join("a.wav");
        write_at(&output, "y", t(20));
        assert_eq!(
            assess(&[&output], &[&input]).unwrap(),
            Freshness::Stale(StaleReason::MissingInput { path: input })
        );
    }

    #[test]
    fn test_stage_without_inputs_is_fresh_once_written() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.txt");
        write_at(&output, "Aura: hola", t(1));
        let inputs: [&Path; 0] = [];
        assert!(assess(&[&output], &inputs).unwrap().is_fresh());
    }

    #[test]
    fn test_reason_display() {
        let reason = StaleReason::MissingOutput { path: PathBuf::from("o/x.srt") };
        assert_eq!(reason.to_string(), "output o/x.srt is missing");
        assert_eq!(StaleReason::Forced.to_string(), "forced");
    }
}
