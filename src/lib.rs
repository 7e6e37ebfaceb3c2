//! Subweld - subtitle timing and media composition engine
//!
//! Takes a video file and an audio file, transcribes the audio into timed
//! subtitle cues, and renders a new video with the audio track replaced and
//! the cues burned in as bottom-center text overlays.

pub mod composer;
pub mod config;
pub mod media;
pub mod pipeline;
pub mod segmenter;
pub mod srt;
pub mod transcription;

// Re-export main types for easy access
pub use crate::composer::{Composer, CompositionResult, RenderPlan};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::media::{MediaInfo, MediaKind, MediaSource, ReleaseProbe};
pub use crate::pipeline::{Pipeline, PipelineOutcome};
pub use crate::segmenter::{Cue, SubtitleSegmenter};
pub use crate::srt::SrtFormatter;
pub use crate::transcription::{RemoteTranscriber, Transcriber};

/// Result type for subweld operations
pub type Result<T> = std::result::Result<T, SubweldError>;

/// Error types for segmentation, transcription and composition
#[derive(thiserror::Error, Debug)]
pub enum SubweldError {
    #[error("transcript contains no words to segment")]
    EmptyTranscript,

    #[error("total duration must be positive, got {0}s")]
    InvalidDuration(f64),

    #[error("cannot open media source {path}: {reason}")]
    SourceOpen { path: std::path::PathBuf, reason: String },

    #[error("failed to build overlay for cue {index}: {reason}")]
    OverlayConstruction { index: u32, reason: String },

    #[error("composition failed during {stage}")]
    Composition {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("speech could not be recognized from the audio")]
    UnrecognizedSpeech,

    #[error("transcription service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubweldError {
    /// Wrap an underlying failure as a composition error for the given stage.
    pub fn composition<E>(stage: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SubweldError::Composition {
            stage,
            source: Box::new(source),
        }
    }

    pub fn composition_msg(stage: &'static str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        SubweldError::Composition {
            stage,
            source: message.into(),
        }
    }
}
