use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::TranscriptionConfig;
use crate::{Result, SubweldError};

/// Boundary to the external speech-to-text collaborator
///
/// The service either returns a plain transcript string, reports the audio
/// as unrecognizable, or is unavailable. Nothing is retried here; transient
/// recovery is the caller's policy.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// HTTP client for a remote transcription service
pub struct RemoteTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl RemoteTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                SubweldError::Configuration(format!("cannot build transcription client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        info!(
            "🎤 Transcribing {} via {}",
            audio_path.display(),
            self.config.endpoint
        );

        let audio_data = tokio::fs::read(audio_path).await?;

        let part = reqwest::multipart::Part::bytes(audio_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SubweldError::ServiceUnavailable(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new().part("audio", part);

        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&self.config.endpoint);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubweldError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubweldError::ServiceUnavailable(format!(
                "service returned {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SubweldError::ServiceUnavailable(e.to_string()))?;

        let transcript = parse_transcript(&body)?;
        info!("✅ Transcription received: {} characters", transcript.len());
        Ok(transcript)
    }
}

/// Extract the transcript from a service response body
///
/// A response without usable text means the service heard silence or noise.
fn parse_transcript(body: &serde_json::Value) -> Result<String> {
    let text = body["text"].as_str().unwrap_or("").trim();
    if text.is_empty() {
        return Err(SubweldError::UnrecognizedSpeech);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_builds_with_configured_timeout() {
        let config = crate::config::Config::default().transcription;
        assert!(RemoteTranscriber::new(config).is_ok());
    }

    #[test]
    fn test_parse_transcript_with_text() {
        let body = json!({ "text": "hello world" });
        assert_eq!(parse_transcript(&body).unwrap(), "hello world");
    }

    #[test]
    fn test_parse_transcript_trims_whitespace() {
        let body = json!({ "text": "  hello  " });
        assert_eq!(parse_transcript(&body).unwrap(), "hello");
    }

    #[test]
    fn test_empty_text_is_unrecognized_speech() {
        let body = json!({ "text": "" });
        assert!(matches!(
            parse_transcript(&body),
            Err(SubweldError::UnrecognizedSpeech)
        ));
    }

    #[test]
    fn test_missing_text_field_is_unrecognized_speech() {
        let body = json!({ "status": "done" });
        assert!(matches!(
            parse_transcript(&body),
            Err(SubweldError::UnrecognizedSpeech)
        ));
    }
}
