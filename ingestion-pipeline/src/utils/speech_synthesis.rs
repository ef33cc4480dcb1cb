use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{
    error::AppError,
    utils::text_cleanup::{strip_markdown, truncate_bytes},
};

/// Google caps synthesis input at 5000 bytes.
pub const MAX_SYNTHESIS_BYTES: usize = 5000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

/// Turns markdown-ish model output into speakable text within the synthesis limit.
pub fn prepare_speech_text(text: &str) -> Result<String, AppError> {
    let plain = strip_markdown(text);
    let capped = truncate_bytes(plain.trim(), MAX_SYNTHESIS_BYTES).trim();
    if capped.is_empty() {
        return Err(AppError::Validation("Text to synthesize is empty".into()));
    }
    Ok(capped.to_string())
}

/// Google Text-to-Speech v1 REST client.
#[derive(Clone)]
pub struct TextToSpeechClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TextToSpeechClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Synthesizes `text` with the given voice and returns MP3 bytes.
    pub async fn synthesize_mp3(
        &self,
        text: &str,
        language_code: &str,
        voice_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        let text = prepare_speech_text(text)?;
        let request = SynthesizeRequest {
            input: SynthesisInput { text: &text },
            voice: VoiceSelection {
                language_code,
                name: voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Speech synthesis", status, &body));
        }

        let parsed: SynthesizeResponse = response.json().await?;
        let audio = decode_audio(&parsed.audio_content)?;
        info!(chars = text.len(), bytes = audio.len(), voice = voice_name, "Synthesized speech");
        Ok(audio)
    }
}

fn decode_audio(encoded: &str) -> Result<Vec<u8>, AppError> {
    if encoded.is_empty() {
        return Err(AppError::Upstream(
            "Speech synthesis returned no audio".into(),
        ));
    }
    STANDARD
        .decode(encoded)
        .map_err(|e| AppError::Upstream(format!("Speech synthesis returned invalid audio: {e}")))
}
