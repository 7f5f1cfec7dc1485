//! Default external commands for each stage.

use super::CommandTemplate;
use crate::config::{SubtitleStrategy, VideoOptions};
use crate::core::StageName;
use crate::errors::PodflowResult;

/// Interpreter used for the bundled generator scripts.
pub const PYTHON: &str = "python";

/// Encoder binary for the Video stage.
pub const FFMPEG: &str = "ffmpeg";

/// Commands a stage runs when the configuration does not override them.
///
/// Script writing and speech synthesis have no bundled tool: their command
/// lists come only from `commands.script` and `commands.audio`, and running
/// them without one fails with `ConfigResolution`.
///
/// # Errors
///
/// Returns `ConfigResolution` if the video options are invalid.
pub fn default_commands(
    stage: StageName,
    strategy: SubtitleStrategy,
    video: &VideoOptions,
) -> PodflowResult<Vec<CommandTemplate>> {
    let commands = match stage {
        StageName::Script | StageName::Audio => Vec::new(),
        StageName::Subtitles => match strategy {
            SubtitleStrategy::Asr => vec![
                python(&["srt_whisper.py", "--audio", "{audio}", "--out", "{srt}"]),
                python(&["srt_to_ass.py", "--srt", "{srt}", "--txt", "{script}", "--out", "{ass}"]),
            ],
            SubtitleStrategy::Timeline => vec![python(&[
                "timeline_to_subs.py",
                "--timeline",
                "{timeline}",
                "--srt",
                "{srt}",
                "--ass",
                "{ass}",
            ])],
        },
        StageName::Video => vec![video_command(video)?],
    };
    Ok(commands)
}

fn python(args: &[&str]) -> CommandTemplate {
    CommandTemplate::new(std::iter::once(PYTHON).chain(args.iter().copied()))
}

/// The ASS style forced onto burned subtitles.
#[must_use]
pub fn force_style(video: &VideoOptions) -> String {
    format!(
        "FontName={},Fontsize={},Outline={},Shadow={},Alignment=2,MarginV={}",
        video.font, video.font_size, video.outline, video.shadow, video.margin_v
    )
}

/// Builds the ffmpeg invocation rendering a looped still image over the
/// audio track.
///
/// Subtitles are either burned into the frame through libass (`{srt_filter}`
/// is the filter-escaped subtitle path) or muxed as a soft `mov_text` track.
///
/// # Errors
///
/// Returns `ConfigResolution` if `video.resolution` is invalid.
pub fn video_command(video: &VideoOptions) -> PodflowResult<CommandTemplate> {
    let (width, height) = video.dimensions()?;
    let mut filter = format!("scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height}");
    if video.burn_subtitles {
        filter.push_str(&format!(",subtitles='{{srt_filter}}':force_style='{}'", force_style(video)));
    }

    let fps = video.fps.to_string();
    let crf = video.crf.to_string();
    let mut argv: Vec<String> = [FFMPEG, "-y", "-r", fps.as_str(), "-loop", "1", "-i", "{image}", "-i", "{audio}"]
        .into_iter()
        .map(String::from)
        .collect();
    if !video.burn_subtitles {
        argv.extend(["-i", "{srt}"].map(String::from));
    }
    argv.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            video.preset.as_str(),
            "-crf",
            crf.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-vf",
            filter.as_str(),
        ]
        .map(String::from),
    );
    if !video.burn_subtitles {
        argv.extend(["-map", "0:v", "-map", "1:a", "-map", "2:s", "-c:s", "mov_text"].map(String::from));
    }
    argv.extend(
        [
            "-c:a",
            "aac",
            "-b:a",
            video.audio_bitrate.as_str(),
            "-movflags",
            "+faststart",
            "-shortest",
            "{video}",
        ]
        .map(String::from),
    );
    Ok(CommandTemplate::new(argv))
}

/// Escapes a path for use inside a single-quoted ffmpeg filter argument.
#[must_use]
pub fn escape_filter_path(path: &std::path::Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', r"'\''")
}
