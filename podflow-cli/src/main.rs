use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use podflow::config::{PodcastConfig, SubtitleStrategy, DEFAULT_CONFIG_PATH};
use podflow::context::RunContext;
use podflow::core::{ArtifactKind, StageName};
use podflow::events::LoggingEventSink;
use podflow::pipeline::{Pipeline, PipelineReport, RunFlags, StageGraph};
use podflow::runner::ProcessRunner;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "podflow", version, about = "Turn a topic into a narrated podcast video")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration document.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Podcast topic (overrides the config's `tema`).
    #[arg(long, global = true)]
    topic: Option<String>,

    /// Output directory slug (overrides slugification of the topic).
    #[arg(long, global = true)]
    slug: Option<String>,

    /// Artifact basename (defaults to the slug).
    #[arg(long, global = true)]
    basename: Option<String>,

    /// Print the report as JSON on stdout.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the dialogue script.
    GenerateScript,
    /// Synthesize speech from the script.
    GenerateAudio(AudioArgs),
    /// Produce SRT and styled ASS subtitles for the audio.
    GenerateSubtitles(SubtitleArgs),
    /// Render the final video (requires `ffmpeg` on PATH).
    GenerateVideo(VideoArgs),
    /// Run every stage, skipping the ones whose outputs are up to date.
    RunAll(RunAllArgs),
    /// Print the expected artifact paths without running anything.
    Paths,
}

#[derive(Args, Debug)]
struct AudioArgs {
    /// Keep an existing audio file if it is newer than the script.
    #[arg(long, default_value_t = false)]
    reuse: bool,
}

#[derive(Args, Debug)]
struct SubtitleArgs {
    /// Build subtitles from the synthesizer's timeline file.
    #[arg(long, conflicts_with = "from_asr")]
    from_timeline: bool,

    /// Build subtitles by transcribing the audio.
    #[arg(long)]
    from_asr: bool,
}

#[derive(Args, Debug)]
struct VideoArgs {
    /// Background image.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Output MP4 path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Mux subtitles as a selectable track instead of burning them in.
    #[arg(long, default_value_t = false)]
    soft_subs: bool,
}

#[derive(Args, Debug)]
struct RunAllArgs {
    /// Resume at this stage; earlier stages are left alone.
    #[arg(long)]
    from_stage: Option<StageName>,

    /// Run every stage even if its outputs are up to date.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Keep going when these stages fail.
    #[arg(long, value_delimiter = ',')]
    continue_past: Vec<StageName>,
}

/// What a subcommand asks the driver to do.
struct Plan {
    flags: RunFlags,
    video_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("podflow: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(&cli.global)?;

    let Some(plan) = plan(&cli.cmd, &mut config) else {
        let ctx = RunContext::resolve(&config).context("resolve run context")?;
        print_paths(&ctx, cli.global.json)?;
        return Ok(ExitCode::SUCCESS);
    };

    let mut ctx = RunContext::resolve(&config).context("resolve run context")?;
    if let Some(out) = plan.video_out {
        ctx = ctx.with_artifact_override(ArtifactKind::Video, out);
    }
    let graph = StageGraph::podcast(&ctx).context("build stage graph")?;

    let report = Pipeline::new(graph, Arc::new(ProcessRunner::new()))
        .with_event_sink(Arc::new(LoggingEventSink::default()))
        .run(&ctx, &plan.flags)
        .await;

    print_report(&report, cli.global.json)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<PodcastConfig> {
    let mut config = PodcastConfig::from_path(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;
    if let Some(topic) = &args.topic {
        config.topic = Some(topic.clone());
    }
    if let Some(slug) = &args.slug {
        config.output_slug = Some(slug.clone());
    }
    if let Some(basename) = &args.basename {
        config.output_basename = Some(basename.clone());
    }
    Ok(config)
}

/// Folds subcommand flags into the config; `None` means nothing runs.
fn plan(cmd: &Command, config: &mut PodcastConfig) -> Option<Plan> {
    let plan = |flags| Some(Plan { flags, video_out: None });
    match cmd {
        Command::GenerateScript => plan(RunFlags::single(StageName::Script).force(StageName::Script)),
        Command::GenerateAudio(args) => {
            let flags = RunFlags::single(StageName::Audio);
            plan(if args.reuse { flags } else { flags.force(StageName::Audio) })
        }
        Command::GenerateSubtitles(args) => {
            if args.from_timeline {
                config.subtitles = SubtitleStrategy::Timeline;
            } else if args.from_asr {
                config.subtitles = SubtitleStrategy::Asr;
            }
            plan(RunFlags::single(StageName::Subtitles).force(StageName::Subtitles))
        }
        Command::GenerateVideo(args) => {
            if let Some(image) = &args.image {
                config.image = Some(image.clone());
            }
            if args.soft_subs {
                config.video.burn_subtitles = false;
            }
            Some(Plan {
                flags: RunFlags::single(StageName::Video).force(StageName::Video),
                video_out: args.out.clone(),
            })
        }
        Command::RunAll(args) => {
            let mut flags = RunFlags::new();
            if let Some(stage) = args.from_stage {
                flags = flags.from_stage(stage);
            }
            if args.force {
                flags = flags.force_all();
            }
            for stage in &args.continue_past {
                flags = flags.continue_past(*stage);
            }
            plan(flags)
        }
        Command::Paths => None,
    }
}

fn print_paths(ctx: &RunContext, json: bool) -> anyhow::Result<()> {
    let paths = ctx.expected_paths();
    if json {
        println!("{}", serde_json::to_string_pretty(&paths).context("serialize paths")?);
    } else {
        for (kind, path) in &paths {
            println!("{kind}\t{}", path.display());
        }
    }
    Ok(())
}

fn print_report(report: &PipelineReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", report.to_json().context("serialize report")?);
    } else {
        println!("{report}");
    }
    for failure in report.failures() {
        eprintln!(
            "podflow: stage '{}' failed: {}",
            failure.stage,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
