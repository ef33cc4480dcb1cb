use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use common::{error::AppError, utils::config::AppConfig};

use crate::utils::{
    audio_transcription::{encoding_for_content_type, RecognitionConfig, SpeechToTextClient},
    speech_synthesis::TextToSpeechClient,
};

#[derive(Debug, Clone, Default)]
pub struct TranscriptionOptions {
    pub language_code: Option<String>,
    pub sample_rate_hertz: Option<u32>,
    /// Recognizer encoding name such as `WEBM_OPUS`. Derived from `content_type` when absent.
    pub encoding: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub language_code: Option<String>,
    pub voice_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub transcript: String,
    pub confidence: Option<f32>,
    pub long_running: bool,
}

#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: TranscriptionOptions,
    ) -> Result<Transcript, AppError>;

    /// Returns MP3 bytes.
    async fn synthesize(&self, text: &str, options: SynthesisOptions)
        -> Result<Vec<u8>, AppError>;
}

/// Speech service backed by Google Speech-to-Text and Text-to-Speech.
pub struct GoogleSpeech {
    stt: SpeechToTextClient,
    tts: TextToSpeechClient,
    default_language: String,
    default_voice: String,
    sync_max_bytes: usize,
}

impl GoogleSpeech {
    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self {
            stt: SpeechToTextClient::new(
                client.clone(),
                &config.speech_base_url,
                &config.google_api_key,
                Duration::from_millis(config.speech_poll_interval_ms),
                config.speech_poll_max_attempts,
            ),
            tts: TextToSpeechClient::new(client, &config.tts_base_url, &config.google_api_key),
            default_language: config.speech_language_code.clone(),
            default_voice: config.tts_voice_name.clone(),
            sync_max_bytes: config.speech_sync_max_bytes,
        }
    }

    fn recognition_config(&self, options: TranscriptionOptions) -> RecognitionConfig {
        let encoding = options.encoding.filter(|e| !e.trim().is_empty()).or_else(|| {
            options
                .content_type
                .as_deref()
                .and_then(encoding_for_content_type)
                .map(str::to_string)
        });

        RecognitionConfig {
            encoding,
            sample_rate_hertz: options.sample_rate_hertz,
            language_code: options
                .language_code
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| self.default_language.clone()),
            enable_automatic_punctuation: true,
        }
    }
}

#[async_trait]
impl SpeechService for GoogleSpeech {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: TranscriptionOptions,
    ) -> Result<Transcript, AppError> {
        if audio.is_empty() {
            return Err(AppError::Validation("Audio payload is empty".into()));
        }

        let config = self.recognition_config(options);
        let long_running = audio.len() > self.sync_max_bytes;
        info!(
            bytes = audio.len(),
            long_running,
            encoding = ?config.encoding,
            language = %config.language_code,
            "Transcribing audio"
        );

        let recognized = if long_running {
            self.stt.recognize_long_running(&audio, &config).await?
        } else {
            self.stt.recognize(&audio, &config).await?
        };

        Ok(Transcript {
            transcript: recognized.text,
            confidence: recognized.confidence,
            long_running,
        })
    }

    async fn synthesize(
        &self,
        text: &str,
        options: SynthesisOptions,
    ) -> Result<Vec<u8>, AppError> {
        let language = options
            .language_code
            .unwrap_or_else(|| self.default_language.clone());
        let voice = options
            .voice_name
            .unwrap_or_else(|| self.default_voice.clone());

        self.tts.synthesize_mp3(text, &language, &voice).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_config_falls_back_to_defaults() {
        let speech = GoogleSpeech::from_config(&AppConfig::default(), reqwest::Client::new());

        let config = speech.recognition_config(TranscriptionOptions {
            content_type: Some("audio/webm;codecs=opus".into()),
            ..Default::default()
        });
        assert_eq!(config.encoding.as_deref(), Some("WEBM_OPUS"));
        assert_eq!(config.language_code, "en-US");

        let config = speech.recognition_config(TranscriptionOptions {
            language_code: Some("sv-SE".into()),
            sample_rate_hertz: Some(16_000),
            encoding: Some("LINEAR16".into()),
            content_type: Some("audio/webm".into()),
        });
        assert_eq!(config.encoding.as_deref(), Some("LINEAR16"));
        assert_eq!(config.language_code, "sv-SE");
        assert_eq!(config.sample_rate_hertz, Some(16_000));
    }

    #[tokio::test]
    async fn empty_audio_is_rejected_without_network() {
        let speech = GoogleSpeech::from_config(&AppConfig::default(), reqwest::Client::new());
        let err = speech
            .transcribe(Vec::new(), TranscriptionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
