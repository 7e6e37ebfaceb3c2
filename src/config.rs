use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Result, SubweldError};

/// Configuration for the subweld pipeline
///
/// Passed explicitly into the pipeline and composer at construction time;
/// nothing here is process-global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Subtitle segmentation settings
    pub subtitles: SubtitleConfig,

    /// Render and encode settings
    pub render: RenderConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Input/output file settings
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleConfig {
    /// Maximum words accumulated into one cue before it is closed
    pub max_words_per_cue: usize,

    /// Font size for burned-in text
    pub font_size: u32,

    /// Font color for burned-in text
    pub font_color: String,

    /// Optional font file used by the overlay renderer
    pub font_file: Option<PathBuf>,

    /// Write the cue sequence as an SRT sidecar next to the output
    pub write_srt_sidecar: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output video codec
    pub video_codec: String,

    /// Output audio codec
    pub audio_codec: String,

    /// Fraction of the frame width available to subtitle text
    pub overlay_width_ratio: f64,

    /// Bottom margin as a fraction of the frame height
    pub bottom_margin_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Endpoint of the speech-to-text service
    pub endpoint: String,

    /// API key for the service, if required
    pub api_key: Option<String>,

    /// Language hint passed through to the service
    pub language: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Sample rate of the wav handed to the recognizer
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Accepted video input extensions
    pub allowed_video_extensions: Vec<String>,

    /// Accepted audio input extensions
    pub allowed_audio_extensions: Vec<String>,

    /// Default output filename when the caller does not pick one
    pub default_output_filename: String,
}

impl Config {
    /// Load configuration from the usual file locations, falling back to env
    pub fn load() -> Result<Self> {
        let config_paths = [
            "subweld.toml",
            "config/subweld.toml",
            "~/.config/subweld/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.validate()?;
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("SUBWELD_TRANSCRIPTION_ENDPOINT") {
            config.transcription.endpoint = endpoint;
        }

        if let Ok(api_key) = std::env::var("SUBWELD_API_KEY") {
            config.transcription.api_key = Some(api_key);
        }

        if let Ok(max_words) = std::env::var("SUBWELD_MAX_WORDS_PER_CUE") {
            if let Ok(n) = max_words.parse() {
                config.subtitles.max_words_per_cue = n;
            }
        }

        if let Ok(font_file) = std::env::var("SUBWELD_FONT_FILE") {
            config.subtitles.font_file = Some(PathBuf::from(font_file));
        }

        config
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| SubweldError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.subtitles.max_words_per_cue == 0 {
            return Err(SubweldError::Configuration(
                "max_words_per_cue must be greater than 0".to_string(),
            ));
        }

        if self.subtitles.font_size == 0 {
            return Err(SubweldError::Configuration(
                "font_size must be greater than 0".to_string(),
            ));
        }

        if !(self.render.overlay_width_ratio > 0.0 && self.render.overlay_width_ratio <= 1.0) {
            return Err(SubweldError::Configuration(format!(
                "overlay_width_ratio must be in (0, 1], got {}",
                self.render.overlay_width_ratio
            )));
        }

        if self.transcription.endpoint.is_empty() {
            return Err(SubweldError::Configuration(
                "transcription endpoint must be set".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subtitles: SubtitleConfig {
                max_words_per_cue: 8,
                font_size: 24,
                font_color: "yellow".to_string(),
                font_file: None,
                write_srt_sidecar: true,
            },
            render: RenderConfig {
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                overlay_width_ratio: 0.8,
                bottom_margin_ratio: 0.05,
            },
            transcription: TranscriptionConfig {
                endpoint: "http://localhost:9000/transcribe".to_string(),
                api_key: None,
                language: None,
                timeout_seconds: 300,
                sample_rate: 16000, // 16kHz optimal for speech recognition
            },
            storage: StorageConfig {
                allowed_video_extensions: vec!["mp4".to_string()],
                allowed_audio_extensions: vec!["mp3".to_string(), "wav".to_string()],
                default_output_filename: "output_video_with_subtitles.mp4".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_max_words_per_cue(mut self, max_words: usize) -> Self {
        self.config.subtitles.max_words_per_cue = max_words;
        self
    }

    pub fn with_font_file(mut self, font_file: PathBuf) -> Self {
        self.config.subtitles.font_file = Some(font_file);
        self
    }

    pub fn with_transcription_endpoint(mut self, endpoint: String) -> Self {
        self.config.transcription.endpoint = endpoint;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn write_srt_sidecar(mut self, enable: bool) -> Self {
        self.config.subtitles.write_srt_sidecar = enable;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
