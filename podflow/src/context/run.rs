//! Resolved, immutable per-run values.

use super::RunIdentity;
use crate::config::{PodcastConfig, SubtitleStrategy, VideoOptions, DEFAULT_IMAGES};
use crate::core::{ArtifactKind, StageName};
use crate::errors::PodflowResult;
use crate::naming::{ArtifactNamer, DEFAULT_OUTPUTS_ROOT};
use crate::runner::{default_commands, CommandTemplate};
use crate::slug::{self, Slug};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything a run needs, frozen before the first stage starts.
///
/// Passed explicitly to the graph, the driver and the runner; nothing is read
/// from process-global state after construction.
#[derive(Debug, Clone)]
pub struct RunContext {
    identity: RunIdentity,
    topic: String,
    namer: ArtifactNamer,
    image: PathBuf,
    strategy: SubtitleStrategy,
    video: VideoOptions,
    command_overrides: BTreeMap<StageName, Vec<CommandTemplate>>,
    working_dir: Option<PathBuf>,
}

impl RunContext {
    /// Resolves a context with paths relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTopic` if an explicit topic has no slug characters and
    /// `ConfigResolution` for invalid overrides.
    pub fn resolve(config: &PodcastConfig) -> PodflowResult<Self> {
        Self::build(config, None)
    }

    /// Resolves a context whose relative paths and tool working directory are
    /// anchored at `base_dir`.
    ///
    /// # Errors
    ///
    /// Same as [`RunContext::resolve`].
    pub fn resolve_in(config: &PodcastConfig, base_dir: impl Into<PathBuf>) -> PodflowResult<Self> {
        Self::build(config, Some(base_dir.into()))
    }

    fn build(config: &PodcastConfig, base_dir: Option<PathBuf>) -> PodflowResult<Self> {
        let base = base_dir.as_deref();
        let topic = config.topic_or_default().to_string();

        let slug = match config.output_slug.as_deref() {
            Some(explicit) => Slug::parse(explicit)?,
            None => slug::resolve(&topic)?,
        };

        let root = anchor(
            base,
            config
                .outputs_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUTS_ROOT)),
        );
        let mut namer = ArtifactNamer::new(root, slug);
        if let Some(basename) = config.output_basename.as_deref() {
            namer = namer.with_basename(basename)?;
        }

        let image = match &config.image {
            Some(image) => anchor(base, image.clone()),
            None => default_image(base),
        };

        let command_overrides = config.command_overrides()?;

        let ctx = Self {
            identity: RunIdentity::new(),
            topic,
            namer,
            image,
            strategy: config.subtitles,
            video: config.video.clone(),
            command_overrides,
            working_dir: base_dir,
        };
        ctx.warn_on_legacy_layout();
        debug!(
            run_id = %ctx.identity.run_id,
            topic = %ctx.topic,
            slug = %ctx.slug(),
            basename = ctx.namer.basename(),
            "resolved run context"
        );
        Ok(ctx)
    }

    fn warn_on_legacy_layout(&self) {
        if self.namer.basename() != self.slug().as_str() {
            return;
        }
        let legacy = format!("podcast_{}", self.slug());
        let legacy_audio = self
            .namer
            .path_for_parts(&legacy, None, ArtifactKind::Audio.extension());
        if legacy_audio.exists() && !self.path_for(ArtifactKind::Audio).exists() {
            warn!(
                path = %legacy_audio.display(),
                "found artifacts named with the podcast_<slug> scheme; set output_basename to \"{legacy}\" to reuse them"
            );
        }
    }

    /// Pins an artifact to an explicit path.
    #[must_use]
    pub fn with_artifact_override(mut self, kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        let path = anchor(self.working_dir.as_deref(), path.into());
        self.namer = self.namer.with_override(kind, path);
        self
    }

    /// The run identity.
    #[must_use]
    pub fn identity(&self) -> RunIdentity {
        self.identity
    }

    /// The run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.identity.run_id
    }

    /// The topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The output slug.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        self.namer.slug()
    }

    /// The artifact namer.
    #[must_use]
    pub fn namer(&self) -> &ArtifactNamer {
        &self.namer
    }

    /// Final path of an artifact.
    #[must_use]
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.namer.path_for(kind)
    }

    /// Paths of every artifact this run produces. The timeline file is
    /// only expected under the `timeline` subtitle strategy.
    #[must_use]
    pub fn expected_paths(&self) -> BTreeMap<ArtifactKind, PathBuf> {
        let mut paths = self.namer.all();
        if self.strategy == SubtitleStrategy::Asr {
            paths.remove(&ArtifactKind::Timeline);
        }
        paths
    }

    /// Background image for the Video stage.
    #[must_use]
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Subtitle strategy.
    #[must_use]
    pub fn strategy(&self) -> SubtitleStrategy {
        self.strategy
    }

    /// Video encoding options.
    #[must_use]
    pub fn video(&self) -> &VideoOptions {
        &self.video
    }

    /// Directory external tools run in; `None` means the current directory.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Commands for a stage: the configured override, else the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if the default commands cannot be built
    /// from the video options.
    pub fn commands_for(&self, stage: StageName) -> PodflowResult<Vec<CommandTemplate>> {
        match self.command_overrides.get(&stage) {
            Some(commands) => Ok(commands.clone()),
            None => default_commands(stage, self.strategy, &self.video),
        }
    }
}

fn anchor(base: Option<&Path>, path: PathBuf) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

fn default_image(base: Option<&Path>) -> PathBuf {
    let candidates: Vec<PathBuf> = DEFAULT_IMAGES
        .iter()
        .map(|candidate| anchor(base, PathBuf::from(candidate)))
        .collect();
    candidates
        .iter()
        .find(|candidate| candidate.exists())
        .unwrap_or(&candidates[0])
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TOPIC;
    use crate::errors::PodflowError;
    use pretty_assertions::assert_eq;

    fn config(json: &str) -> PodcastConfig {
        PodcastConfig::from_json_str(json).unwrap()
    }

    #[test]
    fn test_resolves_slug_from_topic() {
        let ctx = RunContext::resolve(&config(r#"{"tema": "El Universo"}"#)).unwrap();
        assert_eq!(ctx.topic(), "El Universo");
        assert_eq!(ctx.slug().as_str(), "el-universo");
        assert_eq!(
            ctx.path_for(ArtifactKind::Video),
            PathBuf::from("outputs/el-universo/el-universo_fast.mp4")
        );
    }

    #[test]
    fn test_expected_paths_follow_subtitle_strategy() {
        let asr = RunContext::resolve(&PodcastConfig::default()).unwrap().expected_paths();
        assert!(!asr.contains_key(&ArtifactKind::Timeline));
        assert_eq!(asr.len(), 5);

        let timeline = RunContext::resolve(&config(r#"{"subtitles": "timeline"}"#)).unwrap().expected_paths();
        assert_eq!(
            timeline.get(&ArtifactKind::Timeline),
            Some(&PathBuf::from("outputs/el-universo/el-universo.timeline.json"))
        );
    }

    #[test]
    fn test_missing_topic_uses_default() {
        let ctx = RunContext::resolve(&PodcastConfig::default()).unwrap();
        assert_eq!(ctx.topic(), DEFAULT_TOPIC);
        assert_eq!(ctx.slug().as_str(), "el-universo");
    }

    #[test]
    fn test_degenerate_topic_is_fatal() {
        let err = RunContext::resolve(&config(r#"{"tema": "!!!"}"#)).unwrap_err();
        assert!(matches!(err, PodflowError::InvalidTopic { .. }));
    }

    #[test]
    fn test_overrides_win() {
        let ctx = RunContext::resolve(&config(
            r#"{"tema": "El Universo", "output_slug": "cosmos", "output_basename": "podcast_cosmos"}"#,
        ))
        .unwrap();
        assert_eq!(ctx.slug().as_str(), "cosmos");
        assert_eq!(
            ctx.path_for(ArtifactKind::Audio),
            PathBuf::from("outputs/cosmos/podcast_cosmos.wav")
        );
    }

    #[test]
    fn test_non_canonical_slug_override_is_rejected() {
        let err = RunContext::resolve(&config(r#"{"output_slug": "El Cosmos"}"#)).unwrap_err();
        assert!(matches!(err, PodflowError::ConfigResolution { .. }));
    }

    #[test]
    fn test_resolve_in_anchors_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::resolve_in(&config(r#"{"tema": "Volcanes"}"#), dir.path()).unwrap();

        assert_eq!(
            ctx.path_for(ArtifactKind::Script),
            dir.path().join("outputs/volcanes/volcanes.txt")
        );
        assert_eq!(ctx.image(), dir.path().join("assets/studio_bg.jpg"));
        assert_eq!(ctx.working_dir(), Some(dir.path()));
    }

    #[test]
    fn test_image_falls_back_to_cover() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/cover.jpg"), "jpg").unwrap();

        let ctx = RunContext::resolve_in(&PodcastConfig::default(), dir.path()).unwrap();
        assert_eq!(ctx.image(), dir.path().join("assets/cover.jpg"));
    }

    #[test]
    fn test_artifact_override() {
        let ctx = RunContext::resolve(&PodcastConfig::default())
            .unwrap()
            .with_artifact_override(ArtifactKind::Video, "/tmp/final.mp4");
        assert_eq!(ctx.path_for(ArtifactKind::Video), PathBuf::from("/tmp/final.mp4"));
    }

    #[test]
    fn test_commands_for_prefers_overrides() {
        let ctx = RunContext::resolve(&config(r#"{"commands": {"script": [["./guion.sh", "{script}"]]}}"#)).unwrap();
        let script = ctx.commands_for(StageName::Script).unwrap();
        assert_eq!(script[0].program(), Some("./guion.sh"));

        assert!(ctx.commands_for(StageName::Audio).unwrap().is_empty());
        let subtitles = ctx.commands_for(StageName::Subtitles).unwrap();
        assert_eq!(subtitles[0].argv()[1], "srt_whisper.py");
    }
}
