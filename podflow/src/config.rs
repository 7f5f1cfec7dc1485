//! Configuration document.
//!
//! The pipeline reads one JSON document per run (`config.json` by default).
//! It is shared with the external tools, which read many keys of their own,
//! so unknown keys are ignored rather than rejected.

use crate::core::StageName;
use crate::errors::{PodflowError, PodflowResult};
use crate::runner::CommandTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Topic used when the document does not name one.
pub const DEFAULT_TOPIC: &str = "El universo";

/// Background images tried in order when `image` is not configured.
pub const DEFAULT_IMAGES: [&str; 2] = ["assets/studio_bg.jpg", "assets/cover.jpg"];

/// How the Subtitles stage obtains timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleStrategy {
    /// Run speech recognition over the audio, then restyle the SRT into ASS.
    #[default]
    #[serde(alias = "whisper", alias = "recognition")]
    Asr,
    /// Derive timings from the synthesizer's timeline metadata.
    Timeline,
}

/// Encoding options for the Video stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    /// Container frame rate.
    pub fps: u32,
    /// Output resolution as `WxH`.
    pub resolution: String,
    /// Subtitle font name.
    pub font: String,
    /// Subtitle font size.
    pub font_size: u32,
    /// Bottom subtitle margin in pixels.
    pub margin_v: u32,
    /// Subtitle outline thickness.
    pub outline: f32,
    /// Subtitle shadow depth.
    pub shadow: u32,
    /// Burn subtitles into the frame instead of muxing a soft track.
    pub burn_subtitles: bool,
    /// x264 preset.
    pub preset: String,
    /// x264 constant rate factor.
    pub crf: u32,
    /// AAC bitrate.
    pub audio_bitrate: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            resolution: "1920x1080".to_string(),
            font: "Arial".to_string(),
            font_size: 28,
            margin_v: 36,
            outline: 1.5,
            shadow: 0,
            burn_subtitles: true,
            preset: "medium".to_string(),
            crf: 18,
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl VideoOptions {
    /// Parses `resolution` into `(width, height)`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` unless the value is `WxH` with even,
    /// non-zero dimensions (yuv420p output requires even sizes).
    pub fn dimensions(&self) -> PodflowResult<(u32, u32)> {
        let invalid = |reason: &str| PodflowError::config("video.resolution", format!("{:?} {reason}", self.resolution));
        let (w, h) = self
            .resolution
            .to_ascii_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().parse::<u32>(), h.trim().parse::<u32>()))
            .ok_or_else(|| invalid("is not in WxH form"))?;
        let (w, h) = (w.map_err(|_| invalid("has a non-numeric width"))?, h.map_err(|_| invalid("has a non-numeric height"))?);
        if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
            return Err(invalid("must have even, non-zero dimensions"));
        }
        Ok((w, h))
    }
}

/// The configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastConfig {
    /// Podcast topic.
    #[serde(rename = "tema", alias = "topic", skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Explicit output directory slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_slug: Option<String>,
    /// Explicit artifact basename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_basename: Option<String>,
    /// Root of the per-topic output directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs_root: Option<PathBuf>,
    /// Background image for the video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Subtitle timing strategy.
    pub subtitles: SubtitleStrategy,
    /// Video encoding options.
    pub video: VideoOptions,
    /// Per-stage command overrides: stage name to a list of argv templates.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, Vec<Vec<String>>>,
}

impl PodcastConfig {
    /// Loads the document at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read, and
    /// `Serialization` if it is not valid JSON for this schema.
    pub fn from_path(path: impl AsRef<Path>) -> PodflowResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` on malformed input.
    pub fn from_json_str(text: &str) -> PodflowResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The configured topic, or [`DEFAULT_TOPIC`] when absent or blank.
    #[must_use]
    pub fn topic_or_default(&self) -> &str {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC)
    }

    /// Command templates overriding a stage's defaults, if configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if a key under `commands` is not a stage
    /// name or a command list is empty.
    pub fn command_overrides(&self) -> PodflowResult<BTreeMap<StageName, Vec<CommandTemplate>>> {
        let mut overrides = BTreeMap::new();
        for (key, argvs) in &self.commands {
            let stage: StageName = key
                .parse()
                .map_err(|err| PodflowError::config(format!("commands.{key}"), format!("{err}")))?;
            if argvs.is_empty() || argvs.iter().any(Vec::is_empty) {
                return Err(PodflowError::config(
                    format!("commands.{key}"),
                    "every command must have at least a program name",
                ));
            }
            overrides.insert(stage, argvs.iter().cloned().map(CommandTemplate::new).collect());
        }
        Ok(overrides)
    }
}
