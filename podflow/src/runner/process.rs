//! Stage runner spawning external tools as child processes.

use super::defaults::escape_filter_path;
use super::staging::{promote_all, StagedOutput};
use super::{StageRunner, TemplateVars};
use crate::context::RunContext;
use crate::core::{Artifact, ArtifactKind, StageOutcome};
use crate::errors::{PodflowError, PodflowResult};
use crate::pipeline::StageSpec;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs stage commands with `tokio::process`.
///
/// Each command is awaited to completion with no timeout. Output
/// placeholders resolve to staging paths, and outputs are promoted only
/// once every command of the stage exited successfully.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    search_path: Option<OsString>,
    extra_env: Vec<(String, String)>,
}

impl ProcessRunner {
    /// Creates a runner that looks programs up on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks programs up in `paths` instead of `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Adds an environment variable for every spawned tool.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    fn check_preconditions(stage: &StageSpec, ctx: &RunContext) -> PodflowResult<()> {
        for precondition in &stage.preconditions {
            if !precondition.path.is_file() {
                return Err(PodflowError::missing_precondition(
                    stage.name,
                    precondition.what.clone(),
                    &precondition.path,
                ));
            }
        }
        for kind in &stage.inputs {
            let path = ctx.path_for(*kind);
            if !path.is_file() {
                return Err(PodflowError::missing_precondition(
                    stage.name,
                    format!("input {kind}"),
                    path,
                ));
            }
        }
        Ok(())
    }

    fn locate(&self, stage: &StageSpec, program: &str, cwd: &Path) -> PodflowResult<PathBuf> {
        let paths = self.search_path.clone().or_else(|| std::env::var_os("PATH"));
        which::which_in(program, paths, cwd).map_err(|err| {
            debug!(stage = %stage.name, program, error = %err, "program lookup failed");
            PodflowError::missing_precondition(stage.name, "external tool", program)
        })
    }

    /// Path each artifact placeholder resolves to while `stage` runs.
    fn artifact_paths(ctx: &RunContext, outputs: &[StagedOutput]) -> Vec<(ArtifactKind, PathBuf)> {
        ArtifactKind::ALL
            .iter()
            .map(|kind| {
                let path = outputs
                    .iter()
                    .find(|slot| slot.kind() == *kind)
                    .map_or_else(|| ctx.path_for(*kind), |slot| slot.staging_path().to_path_buf());
                (*kind, path)
            })
            .collect()
    }

    fn template_vars(ctx: &RunContext, artifacts: &[(ArtifactKind, PathBuf)]) -> TemplateVars {
        let mut vars = TemplateVars::new()
            .with("topic", ctx.topic())
            .with("slug", ctx.slug().as_str())
            .with("basename", ctx.namer().basename())
            .with("outdir", ctx.namer().output_dir().display().to_string())
            .with("image", ctx.image().display().to_string());
        for (kind, path) in artifacts {
            vars.insert(kind.placeholder(), path.display().to_string());
            if *kind == ArtifactKind::Subtitles {
                vars.insert("srt_filter", escape_filter_path(path));
            }
        }
        vars
    }

    fn environment(&self, stage: &StageSpec, ctx: &RunContext, artifacts: &[(ArtifactKind, PathBuf)]) -> Vec<(String, String)> {
        let mut env = vec![
            ("PODFLOW_STAGE".to_string(), stage.name.to_string()),
            ("PODFLOW_RUN_ID".to_string(), ctx.run_id().to_string()),
            ("PODFLOW_TOPIC".to_string(), ctx.topic().to_string()),
            ("PODFLOW_SLUG".to_string(), ctx.slug().to_string()),
            ("PODFLOW_BASENAME".to_string(), ctx.namer().basename().to_string()),
            ("PODFLOW_OUTDIR".to_string(), ctx.namer().output_dir().display().to_string()),
            ("PODFLOW_IMAGE".to_string(), ctx.image().display().to_string()),
        ];
        env.extend(
            artifacts
                .iter()
                .map(|(kind, path)| (kind.env_var().to_string(), path.display().to_string())),
        );
        env.extend(self.extra_env.iter().cloned());
        env
    }

    async fn execute(&self, stage: &StageSpec, ctx: &RunContext) -> PodflowResult<Vec<Artifact>> {
        if stage.commands.is_empty() {
            return Err(PodflowError::config(
                format!("commands.{}", stage.name),
                "no tool is bundled for this stage; configure its command list",
            ));
        }
        Self::check_preconditions(stage, ctx)?;

        let cwd = match ctx.working_dir() {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let outputs = stage
            .outputs
            .iter()
            .map(|kind| StagedOutput::prepare(*kind, ctx.path_for(*kind)))
            .collect::<Result<Vec<_>, _>>()?;
        let artifacts = Self::artifact_paths(ctx, &outputs);
        let vars = Self::template_vars(ctx, &artifacts);
        let env = self.environment(stage, ctx, &artifacts);

        for template in &stage.commands {
            let result = self.spawn(stage, template.resolve(&vars)?, &cwd, &env).await;
            if let Err(err) = result {
                outputs.iter().for_each(StagedOutput::discard);
                return Err(err);
            }
        }

        promote_all(stage.name, &outputs)
    }

    async fn spawn(
        &self,
        stage: &StageSpec,
        argv: Vec<String>,
        cwd: &Path,
        env: &[(String, String)],
    ) -> PodflowResult<()> {
        let Some((program, args)) = argv.split_first() else {
            return Err(PodflowError::config(format!("commands.{}", stage.name), "command is empty"));
        };
        let binary = self.locate(stage, program, cwd)?;

        info!(stage = %stage.name, command = %argv.join(" "), "running external tool");
        let started = Instant::now();
        let output = Command::new(&binary)
            .args(args)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        debug!(
            stage = %stage.name,
            program,
            status = %output.status,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "external tool exited"
        );

        if output.status.success() {
            return Ok(());
        }
        let diagnostics = if output.stderr.iter().any(|b| !b.is_ascii_whitespace()) {
            &output.stderr
        } else {
            &output.stdout
        };
        Err(PodflowError::StageExecution {
            stage: stage.name,
            status: output.status.to_string(),
            message: String::from_utf8_lossy(diagnostics).trim().to_string(),
        })
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(&self, stage: &StageSpec, ctx: &RunContext) -> StageOutcome {
        StageOutcome::from(self.execute(stage, ctx).await)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PodcastConfig;
    use crate::core::{StageName, StageStatus};
    use crate::runner::CommandTemplate;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn context(dir: &Path) -> RunContext {
        RunContext::resolve_in(&PodcastConfig::from_json_str(r#"{"tema": "El Universo"}"#).unwrap(), dir).unwrap()
    }

    fn stage(name: StageName, command: &[&str]) -> StageSpec {
        StageSpec::new(name).with_command(CommandTemplate::new(command.iter().copied()))
    }

    #[tokio::test]
    async fn test_successful_tool_output_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "guion.sh", r#"printf 'Héctor: hola\n' > "$1""#);
        let ctx = context(dir.path());
        let spec = stage(StageName::Script, &["./guion.sh", "{script}"]).with_output(ArtifactKind::Script);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(outcome.is_success(), "{outcome:?}");
        let final_path = ctx.path_for(ArtifactKind::Script);
        assert_eq!(outcome.artifacts(), [Artifact::new(ArtifactKind::Script, final_path.clone())]);
        assert_eq!(fs::read_to_string(final_path).unwrap(), "Héctor: hola\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_diagnostics_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "tts.sh", "echo 'Falta OPENAI_API_KEY para TTS.' >&2\nexit 3");
        let ctx = context(dir.path());
        let spec = stage(StageName::Script, &["./tts.sh"]).with_output(ArtifactKind::Script);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert_eq!(outcome.status(), StageStatus::Failed);
        match outcome.error() {
            Some(PodflowError::StageExecution { stage, status, message }) => {
                assert_eq!(*stage, StageName::Script);
                assert!(status.contains('3'), "{status}");
                assert_eq!(message, "Falta OPENAI_API_KEY para TTS.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!ctx.path_for(ArtifactKind::Script).exists());
    }

    #[tokio::test]
    async fn test_exit_zero_without_output_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "lazy.sh", "exit 0");
        let ctx = context(dir.path());
        let spec = stage(StageName::Script, &["./lazy.sh"]).with_output(ArtifactKind::Script);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(matches!(
            outcome.error(),
            Some(PodflowError::MissingOutput { expected_path, .. }) if *expected_path == ctx.path_for(ArtifactKind::Script)
        ));
    }

    #[tokio::test]
    async fn test_missing_input_is_reported_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        script(dir.path(), "tts.sh", &format!("touch {}", marker.display()));
        let ctx = context(dir.path());
        let spec = stage(StageName::Audio, &["./tts.sh"])
            .with_input(ArtifactKind::Script)
            .with_output(ArtifactKind::Audio);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(matches!(outcome.error(), Some(PodflowError::MissingPrecondition { stage: StageName::Audio, .. })));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_a_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let spec = stage(StageName::Script, &["podflow-no-such-tool-xyz"]).with_output(ArtifactKind::Script);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(matches!(
            outcome.error(),
            Some(PodflowError::MissingPrecondition { what, .. }) if what == "external tool"
        ));
    }

    #[tokio::test]
    async fn test_tools_receive_environment() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "env.sh", r#"printf '%s|%s|%s' "$PODFLOW_STAGE" "$PODFLOW_SLUG" "$PODFLOW_TOPIC" > "$PODFLOW_SCRIPT""#);
        let ctx = context(dir.path());
        let spec = stage(StageName::Script, &["./env.sh"]).with_output(ArtifactKind::Script);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(
            fs::read_to_string(ctx.path_for(ArtifactKind::Script)).unwrap(),
            "script|el-universo|El Universo"
        );
    }

    #[tokio::test]
    async fn test_commands_chain_through_staging_paths() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "asr.sh", r#"echo '1' > "$1""#);
        script(dir.path(), "style.sh", r#"cat "$1" > "$2""#);
        let ctx = context(dir.path());
        let spec = StageSpec::new(StageName::Subtitles)
            .with_output(ArtifactKind::Subtitles)
            .with_output(ArtifactKind::StyledSubtitles)
            .with_command(CommandTemplate::new(["./asr.sh", "{srt}"]))
            .with_command(CommandTemplate::new(["./style.sh", "{srt}", "{ass}"]));

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(outcome.artifacts().len(), 2);
        assert_eq!(fs::read_to_string(ctx.path_for(ArtifactKind::StyledSubtitles)).unwrap(), "1\n");
    }

    #[tokio::test]
    async fn test_long_diagnostics_are_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        script(
            dir.path(),
            "whisper.sh",
            "echo 'RuntimeError: CUDA out of memory' >&2\nfor i in $(seq 1 60); do echo \"  frame $i\" >&2; done\nexit 1",
        );
        let ctx = context(dir.path());
        let spec = stage(StageName::Subtitles, &["./whisper.sh"]).with_output(ArtifactKind::Subtitles);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        match outcome.error() {
            Some(PodflowError::StageExecution { message, .. }) => {
                assert!(message.starts_with("RuntimeError: CUDA out of memory"), "{message}");
                assert!(message.ends_with("frame 60"), "{message}");
                assert_eq!(message.lines().count(), 61);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stage_without_commands_needs_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let spec = StageSpec::new(StageName::Audio).with_output(ArtifactKind::Audio);

        let outcome = ProcessRunner::new().run(&spec, &ctx).await;

        assert!(matches!(
            outcome.error(),
            Some(PodflowError::ConfigResolution { key, .. }) if key == "commands.audio"
        ));
    }

    #[tokio::test]
    async fn test_search_path_resolves_bare_program_names() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        script(&bin, "podflow-test-tts", r#"printf 'RIFF' > "$PODFLOW_AUDIO""#);
        let ctx = context(dir.path());
        let spec = stage(StageName::Audio, &["podflow-test-tts"]).with_output(ArtifactKind::Audio);

        let missing = ProcessRunner::new().run(&spec, &ctx).await;
        assert!(matches!(missing.error(), Some(PodflowError::MissingPrecondition { .. })));

        let outcome = ProcessRunner::new().with_search_path(bin.as_os_str()).run(&spec, &ctx).await;
        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(fs::read_to_string(ctx.path_for(ArtifactKind::Audio)).unwrap(), "RIFF");
    }

    #[tokio::test]
    async fn test_extra_environment_reaches_tools() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "voice.sh", r#"printf '%s' "$TTS_VOICE" > "$PODFLOW_AUDIO""#);
        let ctx = context(dir.path());
        let spec = stage(StageName::Audio, &["./voice.sh"]).with_output(ArtifactKind::Audio);

        let outcome = ProcessRunner::new().with_env("TTS_VOICE", "nova").run(&spec, &ctx).await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(fs::read_to_string(ctx.path_for(ArtifactKind::Audio)).unwrap(), "nova");
    }
}
