use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::composer::{Composer, CompositionResult};
use crate::config::Config;
use crate::media::{self, MediaKind, MediaSource};
use crate::segmenter::{Cue, SubtitleSegmenter};
use crate::srt::SrtFormatter;
use crate::transcription::{RemoteTranscriber, Transcriber};
use crate::{Result, SubweldError};

/// Result of one full pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub composition: CompositionResult,
    pub transcript: String,
    pub cues: Vec<Cue>,
    /// SRT sidecar, when enabled
    pub srt_path: Option<PathBuf>,
    pub processing_time: Duration,
}

/// Single-request orchestration: transcribe, segment, compose
///
/// Runs synchronously to completion; one call owns its media sources and no
/// state survives between calls. Callers must not run two pipelines against
/// the same on-disk inputs concurrently.
pub struct Pipeline {
    config: Config,
    transcriber: Box<dyn Transcriber>,
    segmenter: SubtitleSegmenter,
    composer: Composer,
}

impl Pipeline {
    /// Build a pipeline with the remote transcription client
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = Box::new(RemoteTranscriber::new(config.transcription.clone())?);
        Self::with_transcriber(config, transcriber)
    }

    /// Build a pipeline with a caller-supplied transcription collaborator
    pub fn with_transcriber(config: Config, transcriber: Box<dyn Transcriber>) -> Result<Self> {
        config.validate()?;
        let segmenter = SubtitleSegmenter::new(config.subtitles.max_words_per_cue)?;
        let composer = Composer::new(config.render.clone(), config.subtitles.clone());

        Ok(Self {
            config,
            transcriber,
            segmenter,
            composer,
        })
    }

    /// Process one video/audio pair into a subtitled output file
    pub async fn run(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();

        self.validate_inputs(video_path, audio_path)?;

        info!("🚀 Processing {} + {}", video_path.display(), audio_path.display());

        // The audio source is probed first; its duration drives segmentation
        // and is authoritative for the output length.
        let audio = MediaSource::open(audio_path, MediaKind::Audio).await?;

        let transcript = self.transcribe(audio_path).await?;
        let cues = self.segmenter.segment(&transcript, audio.info.duration)?;
        info!("💬 {} cues over {:.1}s", cues.len(), audio.info.duration.as_secs_f64());

        let srt_path = if self.config.subtitles.write_srt_sidecar {
            let path = output_path.with_extension("srt");
            SrtFormatter::save_to_file(&cues, &path).await?;
            info!("💾 SRT sidecar written: {}", path.display());
            Some(path)
        } else {
            None
        };

        // If the video fails to open, the audio source above is still
        // released on the way out of this scope.
        let video = MediaSource::open(video_path, MediaKind::Video).await?;

        let composition = self.composer.compose(video, audio, &cues, output_path).await?;

        let processing_time = started.elapsed();
        info!("🎉 Finished in {:.1}s", processing_time.as_secs_f64());

        Ok(PipelineOutcome {
            composition,
            transcript,
            cues,
            srt_path,
            processing_time,
        })
    }

    /// Convert the audio for the recognizer and hand it to the collaborator.
    /// The staging directory is cleaned up best-effort; a cleanup failure is
    /// logged and never replaces the transcription outcome.
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let staging = tempfile::tempdir()?;

        let wav_path = media::prepare_recognition_wav(
            audio_path,
            self.config.transcription.sample_rate,
            staging.path(),
        )
        .await?;

        let transcript = self.transcriber.transcribe(&wav_path).await;

        if let Err(e) = staging.close() {
            warn!("Failed to clean up transcription staging dir: {}", e);
        }

        transcript
    }

    fn validate_inputs(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        let storage = &self.config.storage;

        if !media::has_allowed_extension(video_path, &storage.allowed_video_extensions) {
            return Err(SubweldError::Configuration(format!(
                "video input {} is not one of the allowed types: {}",
                video_path.display(),
                storage.allowed_video_extensions.join(", ")
            )));
        }

        if !media::has_allowed_extension(audio_path, &storage.allowed_audio_extensions) {
            return Err(SubweldError::Configuration(format!(
                "audio input {} is not one of the allowed types: {}",
                audio_path.display(),
                storage.allowed_audio_extensions.join(", ")
            )));
        }

        Ok(())
    }

    /// Default output path inside the given directory
    pub fn default_output_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.config.storage.default_output_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::with_transcriber(Config::default(), Box::new(FixedTranscriber("hi there")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_disallowed_video_extension_rejected() {
        let err = pipeline()
            .run(
                Path::new("clip.avi"),
                Path::new("track.mp3"),
                Path::new("out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubweldError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_disallowed_audio_extension_rejected() {
        let err = pipeline()
            .run(
                Path::new("clip.mp4"),
                Path::new("track.ogg"),
                Path::new("out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubweldError::Configuration(_)));
    }

    #[test]
    fn test_default_output_path_uses_configured_name() {
        let path = pipeline().default_output_path(Path::new("/tmp/renders"));
        assert_eq!(
            path,
            PathBuf::from("/tmp/renders/output_video_with_subtitles.mp4")
        );
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = Config::default();
        config.subtitles.max_words_per_cue = 0;
        let result = Pipeline::with_transcriber(config, Box::new(FixedTranscriber("x")));
        assert!(matches!(result, Err(SubweldError::Configuration(_))));
    }
}
