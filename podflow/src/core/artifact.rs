//! Artifact kinds and produced-artifact records.

use super::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The kinds of files the pipeline produces.
///
/// Each kind belongs to exactly one producing stage and carries a fixed
/// extension, so two kinds never share a path inside one output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Plain-text dialogue, one `Speaker: text` line per turn.
    Script,
    /// Synthesized speech.
    Audio,
    /// Optional per-line timing metadata written by the synthesizer.
    Timeline,
    /// Plain-timed subtitles.
    Subtitles,
    /// Styled subtitles carrying per-speaker colors.
    StyledSubtitles,
    /// The rendered video.
    Video,
}

impl ArtifactKind {
    /// All kinds in production order.
    pub const ALL: [Self; 6] = [
        Self::Script,
        Self::Audio,
        Self::Timeline,
        Self::Subtitles,
        Self::StyledSubtitles,
        Self::Video,
    ];

    /// File extension, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Script => "txt",
            Self::Audio => "wav",
            Self::Timeline => "timeline.json",
            Self::Subtitles => "srt",
            Self::StyledSubtitles => "ass",
            Self::Video => "mp4",
        }
    }

    /// Variant suffix appended to the basename by default.
    #[must_use]
    pub const fn default_variant(self) -> Option<&'static str> {
        match self {
            Self::Video => Some("fast"),
            _ => None,
        }
    }

    /// The stage that produces this kind.
    #[must_use]
    pub const fn producer(self) -> StageName {
        match self {
            Self::Script => StageName::Script,
            Self::Audio | Self::Timeline => StageName::Audio,
            Self::Subtitles | Self::StyledSubtitles => StageName::Subtitles,
            Self::Video => StageName::Video,
        }
    }

    /// Name of the command-template placeholder resolving to this artifact.
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Audio => "audio",
            Self::Timeline => "timeline",
            Self::Subtitles => "srt",
            Self::StyledSubtitles => "ass",
            Self::Video => "video",
        }
    }

    /// Environment variable exported to external tools with this artifact's path.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Script => "PODFLOW_SCRIPT",
            Self::Audio => "PODFLOW_AUDIO",
            Self::Timeline => "PODFLOW_TIMELINE",
            Self::Subtitles => "PODFLOW_SRT",
            Self::StyledSubtitles => "PODFLOW_ASS",
            Self::Video => "PODFLOW_VIDEO",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placeholder())
    }
}

/// A file produced (or found fresh) by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What the file is.
    pub kind: ArtifactKind,
    /// Where it lives.
    pub path: PathBuf,
}

impl Artifact {
    /// Creates a new artifact record.
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// The stage that produced this artifact.
    #[must_use]
    pub fn producer(&self) -> StageName {
        self.kind.producer()
    }
}
