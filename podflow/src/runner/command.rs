//! External command templates.
//!
//! A template is an argv whose elements may contain `{name}` placeholders.
//! Placeholders are resolved against [`TemplateVars`] right before the
//! command is spawned; an unknown placeholder is a configuration error.

use crate::errors::{PodflowError, PodflowResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("static pattern"));

/// An argv with `{placeholder}` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    /// Creates a template from argv elements.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// The unresolved program element.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// The raw argv.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Every placeholder name the template references.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        self.argv
            .iter()
            .flat_map(|arg| PLACEHOLDER.captures_iter(arg))
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Substitutes every placeholder.
    ///
    /// # Errors
    ///
    /// Returns `ConfigResolution` if the template is empty or references a
    /// placeholder that has no value.
    pub fn resolve(&self, vars: &TemplateVars) -> PodflowResult<Vec<String>> {
        if self.argv.is_empty() {
            return Err(PodflowError::config("commands", "command template is empty"));
        }
        if let Some(missing) = self.placeholders().into_iter().find(|name| vars.get(name).is_none()) {
            return Err(PodflowError::config(
                missing,
                format!("placeholder used by `{self}` has no value"),
            ));
        }
        Ok(self
            .argv
            .iter()
            .map(|arg| {
                PLACEHOLDER
                    .replace_all(arg, |caps: &regex::Captures<'_>| {
                        vars.get(&caps[1]).unwrap_or_default().to_string()
                    })
                    .into_owned()
            })
            .collect())
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Values available to command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Sets a value, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks a value up.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterates over all values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_substitutes_inside_arguments() {
        let template = CommandTemplate::new(["python", "audio.py", "--script", "{script}", "--out={audio}"]);
        let vars = TemplateVars::new()
            .with("script", "outputs/x/x.txt")
            .with("audio", "outputs/x/x.partial.wav");

        assert_eq!(
            template.resolve(&vars).unwrap(),
            vec!["python", "audio.py", "--script", "outputs/x/x.txt", "--out=outputs/x/x.partial.wav"]
        );
    }

    #[test]
    fn test_unknown_placeholder_is_config_error() {
        let template = CommandTemplate::new(["tool", "{voice_map}"]);
        let err = template.resolve(&TemplateVars::new()).unwrap_err();
        assert!(matches!(err, PodflowError::ConfigResolution { ref key, .. } if key == "voice_map"));
    }

    #[test]
    fn test_empty_template_is_config_error() {
        let template = CommandTemplate::new(Vec::<String>::new());
        assert!(template.resolve(&TemplateVars::new()).is_err());
        assert_eq!(template.program(), None);
    }

    #[test]
    fn test_placeholders_are_collected() {
        let template = CommandTemplate::new(["ffmpeg", "-i", "{image}", "-vf", "subtitles='{srt_filter}'", "{video}"]);
        let names: Vec<_> = template.placeholders().into_iter().collect();
        assert_eq!(names, vec!["image", "srt_filter", "video"]);
    }

    #[test]
    fn test_non_placeholder_braces_pass_through() {
        let template = CommandTemplate::new(["sh", "-c", "echo {} {A}"]);
        assert_eq!(template.resolve(&TemplateVars::new()).unwrap()[2], "echo {} {A}");
    }

    #[test]
    fn test_deserializes_as_plain_array() {
        let template: CommandTemplate = serde_json::from_str(r#"["whisper", "{audio}"]"#).unwrap();
        assert_eq!(template.program(), Some("whisper"));
        assert_eq!(template.to_string(), "whisper {audio}");
    }
}
