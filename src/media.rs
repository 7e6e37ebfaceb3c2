use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{Result, SubweldError};

/// Kind of media stream a source is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    fn codec_type(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Stream metadata extracted from a media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub duration: Duration,
    /// Frame rate, video sources only
    pub frame_rate: Option<f64>,
    /// Frame width in pixels, video sources only
    pub width: Option<u32>,
    /// Frame height in pixels, video sources only
    pub height: Option<u32>,
}

/// An opened, probed media input
///
/// Owned exclusively by one composition request. Closed at most once; a
/// source that goes out of scope unclosed is closed by `Drop`, so every
/// exit path releases it.
#[derive(Debug)]
pub struct MediaSource {
    pub info: MediaInfo,
    released: bool,
    release_count: Arc<AtomicUsize>,
}

/// Cloneable observer of a source's release state, for callers that need to
/// confirm cleanup happened after the source itself is gone.
#[derive(Debug, Clone)]
pub struct ReleaseProbe(Arc<AtomicUsize>);

impl ReleaseProbe {
    /// How many times the source has been released (0 or 1)
    pub fn release_count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }
}

impl MediaSource {
    /// Probe a file with ffprobe and open it as a source of the given kind
    pub async fn open(path: &Path, kind: MediaKind) -> Result<Self> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SubweldError::SourceOpen {
                path: path.to_path_buf(),
                reason: "ffprobe could not read the file".to_string(),
            });
        }

        let probe: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| SubweldError::SourceOpen {
                path: path.to_path_buf(),
                reason: format!("unparseable probe output: {}", e),
            })?;

        let streams = probe["streams"].as_array().cloned().unwrap_or_default();
        let stream = streams
            .iter()
            .find(|s| s["codec_type"] == kind.codec_type())
            .ok_or_else(|| SubweldError::SourceOpen {
                path: path.to_path_buf(),
                reason: format!("no {} stream found", kind.codec_type()),
            })?;

        let duration_seconds: f64 = probe["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        if duration_seconds <= 0.0 {
            return Err(SubweldError::SourceOpen {
                path: path.to_path_buf(),
                reason: "zero duration".to_string(),
            });
        }

        let (frame_rate, width, height) = match kind {
            MediaKind::Video => (
                stream["r_frame_rate"].as_str().and_then(parse_frame_rate),
                stream["width"].as_u64().map(|w| w as u32),
                stream["height"].as_u64().map(|h| h as u32),
            ),
            MediaKind::Audio => (None, None, None),
        };

        let info = MediaInfo {
            path: path.to_path_buf(),
            kind,
            duration: Duration::from_secs_f64(duration_seconds),
            frame_rate,
            width,
            height,
        };

        info!(
            "📹 Opened {} source: {} ({:.1}s)",
            kind.codec_type(),
            path.display(),
            duration_seconds
        );

        Ok(Self::from_info(info))
    }

    /// Wrap already-probed metadata as an owned source
    pub fn from_info(info: MediaInfo) -> Self {
        Self {
            info,
            released: false,
            release_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Observer handle that outlives the source
    pub fn release_probe(&self) -> ReleaseProbe {
        ReleaseProbe(self.release_count.clone())
    }

    /// Release the source. Safe to call more than once; only the first call
    /// counts.
    pub fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.release_count.fetch_add(1, Ordering::SeqCst);
        debug!("Released media source: {}", self.info.path.display());
    }
}

impl Drop for MediaSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Parse an ffprobe frame-rate fraction like "30000/1001"
fn parse_frame_rate(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => raw.parse().ok(),
    }
}

/// Check a path against an allowed-extension list, case-insensitively
pub fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Convert an audio input to a 16-bit PCM mono wav the recognizer accepts
pub async fn prepare_recognition_wav(
    audio_path: &Path,
    sample_rate: u32,
    output_dir: &Path,
) -> Result<PathBuf> {
    let stem = audio_path
        .file_stem()
        .ok_or_else(|| SubweldError::SourceOpen {
            path: audio_path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?
        .to_string_lossy();
    let wav_path = output_dir.join(format!("{}.wav", stem));

    info!("🎵 Preparing recognition wav: {}", audio_path.display());

    let status = tokio::process::Command::new("ffmpeg")
        .arg("-i")
        .arg(audio_path)
        .args([
            "-vn", // No video stream
            "-acodec",
            "pcm_s16le", // 16-bit PCM
            "-ar",
            &sample_rate.to_string(),
            "-ac",
            "1", // Mono
            "-f",
            "wav",
            "-y", // Overwrite existing
        ])
        .arg(&wav_path)
        .status()
        .await?;

    if !status.success() {
        return Err(SubweldError::SourceOpen {
            path: audio_path.to_path_buf(),
            reason: "wav conversion failed".to_string(),
        });
    }

    Ok(wav_path)
}
