//! Artifact path naming.
//!
//! Every artifact lives at `<root>/<slug>/<basename>[_<variant>].<ext>`.
//! The basename defaults to the slug but is tracked separately, since
//! existing output trees use basenames that differ from their slug
//! (`podcast_<slug>` for example).

use crate::core::ArtifactKind;
use crate::errors::{PodflowError, PodflowResult};
use crate::slug::Slug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default root under which per-topic output directories are created.
pub const DEFAULT_OUTPUTS_ROOT: &str = "outputs";

/// Maps artifact kinds to canonical paths for one slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    root: PathBuf,
    slug: Slug,
    basename: String,
    overrides: BTreeMap<ArtifactKind, PathBuf>,
}

impl ArtifactNamer {
    /// Creates a namer whose basename equals the slug.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, slug: Slug) -> Self {
        Self {
            root: root.into(),
            basename: slug.as_str().to_string(),
            slug,
            overrides: BTreeMap::new(),
        }
    }

    /// Overrides the file basename.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if the basename is empty or would escape
    /// the output directory.
    pub fn with_basename(mut self, basename: impl Into<String>) -> PodflowResult<Self> {
        let basename = basename.into().trim().to_string();
        if basename.is_empty() || basename == "." || basename == ".." {
            return Err(PodflowError::config("output_basename", "basename must be a plain file name"));
        }
        if basename.contains(['/', '\\']) {
            return Err(PodflowError::config(
                "output_basename",
                format!("{basename:?} must not contain path separators"),
            ));
        }
        self.basename = basename;
        Ok(self)
    }

    /// Pins one artifact kind to an explicit path (e.g. `--out`).
    #[must_use]
    pub fn with_override(mut self, kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(kind, path.into());
        self
    }

    /// The slug the namer was built for.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// The basename used for every artifact.
    #[must_use]
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// `<root>/<slug>`.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(self.slug.as_str())
    }

    /// Builds `<root>/<slug>/<basename>[_<variant>].<extension>`.
    #[must_use]
    pub fn path_for_parts(&self, basename: &str, variant: Option<&str>, extension: &str) -> PathBuf {
        let file_name = match variant {
            Some(variant) => format!("{basename}_{variant}.{extension}"),
            None => format!("{basename}.{extension}"),
        };
        self.output_dir().join(file_name)
    }

    /// Canonical path for an artifact kind, honoring explicit overrides.
    #[must_use]
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        if let Some(path) = self.overrides.get(&kind) {
            return path.clone();
        }
        self.path_for_parts(&self.basename, kind.default_variant(), kind.extension())
    }

    /// Paths for every artifact kind.
    #[must_use]
    pub fn all(&self) -> BTreeMap<ArtifactKind, PathBuf> {
        ArtifactKind::ALL
            .iter()
            .map(|kind| (*kind, self.path_for(*kind)))
            .collect()
    }

    /// Returns true if `path` is inside this namer's output directory.
    #[must_use]
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(self.output_dir())
    }
}
