use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart};
use ingestion_pipeline::{SynthesisOptions, TranscriptionOptions};
use serde::Deserialize;
use tracing::info;

use crate::{
    api_state::ApiState,
    error::ApiError,
    extract::{ApiJson, ApiMultipart},
};

#[derive(Debug, TryFromMultipart)]
pub struct TranscribeParams {
    #[form_data(limit = "unlimited")]
    pub audio: FieldData<Bytes>,
    pub language_code: Option<String>,
    pub sample_rate_hertz: Option<u32>,
    pub encoding: Option<String>,
}

pub async fn transcribe(
    State(state): State<ApiState>,
    form: ApiMultipart<TranscribeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let input = form.data;
    let audio = input.audio.contents.to_vec();
    if audio.is_empty() {
        return Err(ApiError::ValidationError("audio is empty".to_string()));
    }

    let options = TranscriptionOptions {
        language_code: input.language_code,
        sample_rate_hertz: input.sample_rate_hertz,
        encoding: input.encoding,
        content_type: input.audio.metadata.content_type,
    };
    info!(bytes = audio.len(), "Received audio for transcription");

    let transcript = state.speech.transcribe(audio, options).await?;
    Ok(Json(transcript))
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub voice_name: Option<String>,
}

pub async fn synthesize(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<SynthesizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::ValidationError("text is required".to_string()));
    }

    let audio = state
        .speech
        .synthesize(
            &request.text,
            SynthesisOptions {
                language_code: request.language_code,
                voice_name: request.voice_name,
            },
        )
        .await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
