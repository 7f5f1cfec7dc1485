//! Topic slug resolution.
//!
//! A slug is the filesystem-safe identifier every artifact path is keyed
//! on, so [`resolve`] must be a pure function of the topic text: the same
//! topic always maps to the same output directory, across runs and hosts.

use crate::errors::{PodflowError, PodflowResult};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Characters outside the allow-list: ASCII alphanumerics, the Spanish
/// accented vowels and `ñ`, whitespace and hyphens.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9áéíóúüñ\s-]").expect("static pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("static pattern"));

/// A normalized, filesystem-safe topic identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Accepts an explicit slug (e.g. the `output_slug` override) only if
    /// it is already in canonical form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if `raw` would be changed by [`resolve`].
    pub fn parse(raw: &str) -> PodflowResult<Self> {
        let trimmed = raw.trim();
        match resolve(trimmed) {
            Ok(slug) if slug.as_str() == trimmed => Ok(slug),
            Ok(slug) => Err(PodflowError::config(
                "output_slug",
                format!("{trimmed:?} is not a canonical slug (did you mean {:?}?)", slug.as_str()),
            )),
            Err(_) => Err(PodflowError::config(
                "output_slug",
                format!("{trimmed:?} does not contain any slug characters"),
            )),
        }
    }

    /// Returns the slug text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the slug for a topic.
///
/// Lower-cases (Unicode, locale-independent), strips characters outside
/// the allow-list, turns whitespace runs into single hyphens, collapses
/// hyphen runs and trims hyphens at both ends.
///
/// # Errors
///
/// Returns `InvalidTopic` when nothing survives normalization, since an
/// empty slug would make unrelated runs share `outputs/`.
pub fn resolve(topic: &str) -> PodflowResult<Slug> {
    let lowered = topic.to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&kept, "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    let slug = collapsed.trim_matches('-');

    if slug.is_empty() {
        return Err(PodflowError::InvalidTopic {
            topic: topic.to_string(),
        });
    }
    Ok(Slug(slug.to_string()))
}
