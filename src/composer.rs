use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{RenderConfig, SubtitleConfig};
use crate::media::{MediaKind, MediaSource};
use crate::segmenter::Cue;
use crate::{Result, SubweldError};

/// The rendered output artifact
#[derive(Debug, Clone)]
pub struct CompositionResult {
    pub output_path: PathBuf,
    /// Final output length, equal to the audio duration
    pub duration: Duration,
}

/// Everything decided before ffmpeg runs: reconciled video span, overlay
/// filtergraph, and encode parameters.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    /// Span the video input is truncated to, when it outlasts the audio
    pub video_trim: Option<Duration>,
    /// Output length; the audio track is authoritative
    pub output_duration: Duration,
    /// Encode frame rate, taken from the video source
    pub frame_rate: f64,
    /// Filtergraph layering every cue over the video track
    pub filtergraph: String,
}

/// Renders the final video: audio track replaced, cues burned in
///
/// One `compose` call owns its two sources for its whole span and releases
/// them on every exit path. Any stage failure aborts the render; a partially
/// subtitled output is never reported as success.
#[derive(Debug, Clone)]
pub struct Composer {
    render: RenderConfig,
    subtitles: SubtitleConfig,
}

impl Composer {
    pub fn new(render: RenderConfig, subtitles: SubtitleConfig) -> Self {
        Self { render, subtitles }
    }

    /// Compose video, audio and cues into the output file
    pub async fn compose(
        &self,
        mut video: MediaSource,
        mut audio: MediaSource,
        cues: &[Cue],
        output_path: &Path,
    ) -> Result<CompositionResult> {
        let result = self.compose_inner(&video, &audio, cues, output_path).await;

        // Both sources are released whether the render succeeded or not.
        // Nothing here may replace the primary error.
        video.close();
        audio.close();

        result
    }

    async fn compose_inner(
        &self,
        video: &MediaSource,
        audio: &MediaSource,
        cues: &[Cue],
        output_path: &Path,
    ) -> Result<CompositionResult> {
        let plan = self.plan(video, audio, cues)?;

        info!(
            "🎬 Composing {} cues over {} + {} -> {}",
            cues.len(),
            video.info.path.display(),
            audio.info.path.display(),
            output_path.display()
        );

        self.encode(video, audio, &plan, output_path).await?;

        info!("✅ Composition written: {}", output_path.display());

        Ok(CompositionResult {
            output_path: output_path.to_path_buf(),
            duration: plan.output_duration,
        })
    }

    /// Build the render plan: validate sources, reconcile durations and
    /// construct every overlay. Pure; no subprocess is spawned here.
    pub fn plan(
        &self,
        video: &MediaSource,
        audio: &MediaSource,
        cues: &[Cue],
    ) -> Result<RenderPlan> {
        let width = self.validate_sources(video, audio)?;
        let frame_rate = video.info.frame_rate.unwrap_or(0.0);

        let video_trim = reconcile_durations(video.info.duration, audio.info.duration);

        let overlays = cues
            .iter()
            .map(|cue| self.build_overlay(cue, width))
            .collect::<Result<Vec<_>>>()?;

        let filtergraph = if overlays.is_empty() {
            "[0:v]null[v]".to_string()
        } else {
            format!("[0:v]{}[v]", overlays.join(","))
        };

        Ok(RenderPlan {
            video_trim,
            output_duration: audio.info.duration,
            frame_rate,
            filtergraph,
        })
    }

    fn validate_sources(&self, video: &MediaSource, audio: &MediaSource) -> Result<u32> {
        if video.info.kind != MediaKind::Video {
            return Err(SubweldError::SourceOpen {
                path: video.info.path.clone(),
                reason: "expected a video source".to_string(),
            });
        }
        if audio.info.kind != MediaKind::Audio {
            return Err(SubweldError::SourceOpen {
                path: audio.info.path.clone(),
                reason: "expected an audio source".to_string(),
            });
        }
        for source in [video, audio] {
            if source.info.duration.is_zero() {
                return Err(SubweldError::SourceOpen {
                    path: source.info.path.clone(),
                    reason: "zero duration".to_string(),
                });
            }
        }

        match (video.info.width, video.info.frame_rate) {
            (Some(width), Some(fps)) if width > 0 && fps > 0.0 => Ok(width),
            _ => Err(SubweldError::SourceOpen {
                path: video.info.path.clone(),
                reason: "video stream is missing width or frame rate".to_string(),
            }),
        }
    }

    /// Build one drawtext overlay: bottom-center, wrapped to the configured
    /// share of the frame width, visible during [start, end).
    fn build_overlay(&self, cue: &Cue, frame_width: u32) -> Result<String> {
        if cue.text.is_empty() {
            return Err(SubweldError::OverlayConstruction {
                index: cue.index,
                reason: "cue has no text".to_string(),
            });
        }

        let font_arg = match &self.subtitles.font_file {
            Some(font_file) => {
                if !font_file.exists() {
                    return Err(SubweldError::OverlayConstruction {
                        index: cue.index,
                        reason: format!("font file not found: {}", font_file.display()),
                    });
                }
                format!("fontfile={}:", font_file.to_string_lossy())
            }
            None => String::new(),
        };

        let max_chars = max_chars_per_line(
            frame_width,
            self.render.overlay_width_ratio,
            self.subtitles.font_size,
        );
        let wrapped = wrap_text(&cue.text, max_chars);
        let text = escape_drawtext_text(&wrapped);

        let start = cue.start.as_secs_f64();
        let end = cue.end.as_secs_f64();

        Ok(format!(
            "drawtext={}text='{}':fontsize={}:fontcolor={}:borderw=2:\
             x=(w-text_w)/2:y=h-text_h-h*{}:enable='gte(t,{:.3})*lt(t,{:.3})'",
            font_arg,
            text,
            self.subtitles.font_size,
            self.subtitles.font_color,
            self.render.bottom_margin_ratio,
            start,
            end,
        ))
    }

    /// Run the ffmpeg encode of the planned composite
    async fn encode(
        &self,
        video: &MediaSource,
        audio: &MediaSource,
        plan: &RenderPlan,
        output_path: &Path,
    ) -> Result<()> {
        let mut command = tokio::process::Command::new("ffmpeg");
        command.arg("-y");

        // Truncate the video input when it outlasts the audio. The audio
        // track itself is never trimmed.
        if let Some(trim) = plan.video_trim {
            command.args(["-t", &format!("{:.3}", trim.as_secs_f64())]);
        }
        command.arg("-i").arg(&video.info.path);
        command.arg("-i").arg(&audio.info.path);

        command.args(["-filter_complex", &plan.filtergraph]);
        command.args(["-map", "[v]", "-map", "1:a"]);
        command.args(["-c:v", &self.render.video_codec]);
        command.args(["-c:a", &self.render.audio_codec]);
        command.args(["-r", &format!("{:.3}", plan.frame_rate)]);
        command.arg(output_path);

        let output = command
            .output()
            .await
            .map_err(|e| SubweldError::composition("encode", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(SubweldError::composition_msg(
                "encode",
                format!("ffmpeg exited with {}: {}", output.status, tail),
            ));
        }

        Ok(())
    }
}

/// Decide how the video span is adjusted to the audio length
///
/// Returns the span to truncate the video to when it is longer than the
/// audio. A video shorter than the audio is left alone; the mismatch is
/// surfaced in the log but the output still runs for the full audio length.
pub fn reconcile_durations(video: Duration, audio: Duration) -> Option<Duration> {
    if video > audio {
        info!(
            "✂️ Trimming video from {:.1}s to audio length {:.1}s",
            video.as_secs_f64(),
            audio.as_secs_f64()
        );
        Some(audio)
    } else {
        if video < audio {
            warn!(
                "Video ({:.1}s) is shorter than audio ({:.1}s); output keeps the full audio track",
                video.as_secs_f64(),
                audio.as_secs_f64()
            );
        }
        None
    }
}

/// Usable characters per subtitle line for a given frame width
fn max_chars_per_line(frame_width: u32, width_ratio: f64, font_size: u32) -> usize {
    // Average glyph width approximated as a bit over half the font size.
    let glyph_width = font_size as f64 * 0.55;
    let usable = frame_width as f64 * width_ratio;
    ((usable / glyph_width).floor() as usize).max(1)
}

/// Wrap text at word boundaries to at most `max_line_length` characters
fn wrap_text(text: &str, max_line_length: usize) -> String {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= max_line_length {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines.join("\n")
}

/// Escape cue text for use inside a single-quoted drawtext argument
fn escape_drawtext_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("'\\''"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::MediaInfo;
    use std::path::PathBuf;

    fn video_source(duration_secs: f64) -> MediaSource {
        MediaSource::from_info(MediaInfo {
            path: PathBuf::from("clip.mp4"),
            kind: MediaKind::Video,
            duration: Duration::from_secs_f64(duration_secs),
            frame_rate: Some(30.0),
            width: Some(1280),
            height: Some(720),
        })
    }

    fn audio_source(duration_secs: f64) -> MediaSource {
        MediaSource::from_info(MediaInfo {
            path: PathBuf::from("track.mp3"),
            kind: MediaKind::Audio,
            duration: Duration::from_secs_f64(duration_secs),
            frame_rate: None,
            width: None,
            height: None,
        })
    }

    fn composer() -> Composer {
        let config = Config::default();
        Composer::new(config.render, config.subtitles)
    }

    fn cues() -> Vec<Cue> {
        vec![
            Cue::new(
                1,
                Duration::ZERO,
                Duration::from_secs(3),
                "Hello there".to_string(),
            ),
            Cue::new(
                2,
                Duration::from_secs(3),
                Duration::from_secs(7),
                "General greeting".to_string(),
            ),
        ]
    }

    #[test]
    fn test_longer_video_is_trimmed_to_audio() {
        let trim = reconcile_durations(Duration::from_secs(10), Duration::from_secs(7));
        assert_eq!(trim, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_shorter_video_is_not_extended() {
        let trim = reconcile_durations(Duration::from_secs(5), Duration::from_secs(7));
        assert_eq!(trim, None);
    }

    #[test]
    fn test_equal_durations_need_no_trim() {
        let trim = reconcile_durations(Duration::from_secs(7), Duration::from_secs(7));
        assert_eq!(trim, None);
    }

    #[test]
    fn test_plan_output_length_follows_audio() {
        let plan = composer()
            .plan(&video_source(10.0), &audio_source(7.0), &cues())
            .unwrap();
        assert_eq!(plan.output_duration, Duration::from_secs(7));
        assert_eq!(plan.video_trim, Some(Duration::from_secs(7)));
        assert_eq!(plan.frame_rate, 30.0);
    }

    #[test]
    fn test_plan_builds_one_overlay_per_cue() {
        let plan = composer()
            .plan(&video_source(10.0), &audio_source(10.0), &cues())
            .unwrap();
        assert_eq!(plan.filtergraph.matches("drawtext=").count(), 2);
        assert!(plan.filtergraph.starts_with("[0:v]"));
        assert!(plan.filtergraph.ends_with("[v]"));
        assert!(plan.filtergraph.contains("gte(t,0.000)*lt(t,3.000)"));
        assert!(plan.filtergraph.contains("gte(t,3.000)*lt(t,7.000)"));
    }

    #[test]
    fn test_zero_duration_source_rejected() {
        let err = composer()
            .plan(&video_source(10.0), &audio_source(0.0), &cues())
            .unwrap_err();
        assert!(matches!(err, SubweldError::SourceOpen { .. }));
    }

    #[test]
    fn test_missing_font_fails_overlay_construction() {
        let config = Config::default();
        let mut subtitles = config.subtitles;
        subtitles.font_file = Some(PathBuf::from("/nonexistent/font.ttf"));
        let composer = Composer::new(config.render, subtitles);

        let err = composer
            .plan(&video_source(10.0), &audio_source(10.0), &cues())
            .unwrap_err();
        assert!(matches!(err, SubweldError::OverlayConstruction { .. }));
    }

    #[tokio::test]
    async fn test_sources_released_when_overlay_construction_fails() {
        let config = Config::default();
        let mut subtitles = config.subtitles;
        subtitles.font_file = Some(PathBuf::from("/nonexistent/font.ttf"));
        let composer = Composer::new(config.render, subtitles);

        let video = video_source(10.0);
        let audio = audio_source(7.0);
        let video_probe = video.release_probe();
        let audio_probe = audio.release_probe();

        let result = composer
            .compose(video, audio, &cues(), Path::new("out.mp4"))
            .await;

        assert!(matches!(
            result,
            Err(SubweldError::OverlayConstruction { .. })
        ));
        assert_eq!(video_probe.release_count(), 1);
        assert_eq!(audio_probe.release_count(), 1);
    }

    #[tokio::test]
    async fn test_sources_released_when_validation_fails() {
        // Audio handed in where the video belongs.
        let video = audio_source(10.0);
        let audio = audio_source(7.0);
        let video_probe = video.release_probe();
        let audio_probe = audio.release_probe();

        let result = composer()
            .compose(video, audio, &cues(), Path::new("out.mp4"))
            .await;

        assert!(matches!(result, Err(SubweldError::SourceOpen { .. })));
        assert_eq!(video_probe.release_count(), 1);
        assert_eq!(audio_probe.release_count(), 1);
    }

    #[test]
    fn test_text_wrapping_respects_line_length() {
        let wrapped = wrap_text(
            "this is a fairly long subtitle line that needs wrapping",
            20,
        );
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 20);
        }
        assert!(wrapped.lines().count() > 1);
    }

    #[test]
    fn test_max_chars_scales_with_frame_width() {
        let narrow = max_chars_per_line(640, 0.8, 24);
        let wide = max_chars_per_line(1920, 0.8, 24);
        assert!(wide > narrow);
        assert!(max_chars_per_line(1, 0.8, 24) >= 1);
    }

    #[test]
    fn test_drawtext_escaping() {
        assert_eq!(escape_drawtext_text("50% off"), "50\\% off");
        assert_eq!(escape_drawtext_text("it's"), "it'\\''s");
        assert_eq!(escape_drawtext_text("a\\b"), "a\\\\b");
        assert_eq!(escape_drawtext_text("plain"), "plain");
    }
}
