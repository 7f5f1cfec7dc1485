//! Test fixtures for pipeline testing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::PodcastConfig;
use crate::context::RunContext;
use crate::core::ArtifactKind;
use crate::errors::PodflowResult;

/// A project directory laid out like a real podcast workspace: a
/// `config.json`, an `assets/` folder with a background image, and an
/// `outputs/` tree that runs write into.
///
/// The caller owns the directory (typically a temp dir).
#[derive(Debug, Clone)]
pub struct TestWorkspace {
    root: PathBuf,
    config: PodcastConfig,
}

impl TestWorkspace {
    /// Creates a workspace for `topic` under `root`, including a background
    /// image at `assets/studio_bg.jpg`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be populated.
    pub fn new(root: impl Into<PathBuf>, topic: &str) -> PodflowResult<Self> {
        let root = root.into();
        let workspace = Self {
            config: PodcastConfig {
                topic: Some(topic.to_string()),
                ..PodcastConfig::default()
            },
            root,
        };
        workspace.write_file("assets/studio_bg.jpg", "jpeg")?;
        Ok(workspace)
    }

    /// Replaces the configuration document.
    #[must_use]
    pub fn with_config(mut self, config: PodcastConfig) -> Self {
        self.config = config;
        self
    }

    /// The workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration used for contexts.
    #[must_use]
    pub fn config(&self) -> &PodcastConfig {
        &self.config
    }

    /// Resolves a fresh run context anchored at the workspace root.
    ///
    /// # Errors
    ///
    /// Propagates context resolution errors.
    pub fn context(&self) -> PodflowResult<RunContext> {
        RunContext::resolve_in(&self.config, &self.root)
    }

    /// Writes `config.json` to the workspace root.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Serialization` on failure.
    pub fn write_config(&self) -> PodflowResult<PathBuf> {
        let path = self.root.join(crate::config::DEFAULT_CONFIG_PATH);
        fs::write(&path, serde_json::to_string_pretty(&self.config)?)?;
        Ok(path)
    }

    /// Writes a file relative to the root, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Io` on failure.
    pub fn write_file(&self, relative: impl AsRef<Path>, contents: &str) -> PodflowResult<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Writes an artifact at its canonical path.
    ///
    /// # Errors
    ///
    /// Returns `Io` on failure.
    pub fn write_artifact(&self, kind: ArtifactKind, contents: &str) -> PodflowResult<PathBuf> {
        let path = self.context()?.path_for(kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Sets a file's modification time.
    ///
    /// # Errors
    ///
    /// Returns `Io` on failure.
    pub fn set_modified(&self, path: &Path, modified: SystemTime) -> PodflowResult<()> {
        fs::File::options().write(true).open(path)?.set_modified(modified)?;
        Ok(())
    }
}
