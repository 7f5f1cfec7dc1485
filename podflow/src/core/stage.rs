//! Stage identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of pipeline stages, declared in topological order.
///
/// `Ord` follows declaration order, so sorting stage names yields the
/// execution order Script, Audio, Subtitles, Video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Writes the dialogue script.
    Script,
    /// Synthesizes speech from the script.
    Audio,
    /// Produces timed subtitles for the audio.
    Subtitles,
    /// Renders the final video.
    Video,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [Self::Script, Self::Audio, Self::Subtitles, Self::Video];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Audio => "audio",
            Self::Subtitles => "subtitles",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage '{0}' (expected one of: script, audio, subtitles, video)")]
pub struct UnknownStageError(pub String);

impl FromStr for StageName {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" | "guion" => Ok(Self::Script),
            "audio" | "tts" => Ok(Self::Audio),
            "subtitles" | "subs" | "srt" => Ok(Self::Subtitles),
            "video" => Ok(Self::Video),
            other => Err(UnknownStageError(other.to_string())),
        }
    }
}
