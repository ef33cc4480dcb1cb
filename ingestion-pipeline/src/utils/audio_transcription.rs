use std::{future::Future, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{debug, info, warn};

use common::error::AppError;

/// Audio settings sent along with a recognition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
    pub language_code: String,
    pub enable_automatic_punctuation: bool,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: &'a RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OperationHandle {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    response: Option<RecognizeResponse>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Joined transcript of the best alternative of every result.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Outcome of a single poll of a long-running job.
#[derive(Debug)]
pub enum PollError {
    /// The job has not finished yet; try again after the next interval.
    Pending,
    Failed(AppError),
}

impl From<AppError> for PollError {
    fn from(err: AppError) -> Self {
        Self::Failed(err)
    }
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        Self::Failed(err.into())
    }
}

/// Calls `poll` every `interval` until it stops reporting [`PollError::Pending`].
///
/// At most `max_attempts` calls are made. Running out of attempts while the job is
/// still pending yields [`AppError::Unavailable`].
pub async fn poll_until_done<T, F, Fut>(
    interval: Duration,
    max_attempts: usize,
    poll: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PollError>>,
{
    let strategy = FixedInterval::new(interval).take(max_attempts.saturating_sub(1));

    match RetryIf::spawn(strategy, poll, |err: &PollError| {
        matches!(err, PollError::Pending)
    })
    .await
    {
        Ok(value) => Ok(value),
        Err(PollError::Pending) => Err(AppError::Unavailable(format!(
            "Transcription did not finish after {max_attempts} polls"
        ))),
        Err(PollError::Failed(err)) => Err(err),
    }
}

/// Google Speech-to-Text v1 REST client.
#[derive(Clone)]
pub struct SpeechToTextClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    poll_max_attempts: usize,
}

impl SpeechToTextClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        poll_interval: Duration,
        poll_max_attempts: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            poll_interval,
            poll_max_attempts,
        }
    }

    /// Synchronous recognition, suitable for short clips.
    pub async fn recognize(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> Result<RecognizedText, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/speech:recognize", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&recognize_request(audio, config))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Speech recognition", status, &body));
        }

        let parsed: RecognizeResponse = response.json().await?;
        Ok(join_results(parsed))
    }

    /// Starts a long-running recognition and polls the operation until it completes.
    pub async fn recognize_long_running(
        &self,
        audio: &[u8],
        config: &RecognitionConfig,
    ) -> Result<RecognizedText, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/speech:longrunningrecognize", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&recognize_request(audio, config))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Speech recognition", status, &body));
        }

        let handle: OperationHandle = response.json().await?;
        info!(operation = %handle.name, "Started long-running transcription");

        poll_until_done(self.poll_interval, self.poll_max_attempts, || {
            self.poll_operation(&handle.name)
        })
        .await
    }

    async fn poll_operation(&self, name: &str) -> Result<RecognizedText, PollError> {
        let response = self
            .client
            .get(format!("{}/v1/operations/{name}", self.base_url))
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Speech operation", status, &body).into());
        }

        let operation: Operation = response.json().await?;
        debug!(operation = name, done = operation.done, "Polled transcription");
        finish_operation(operation)
    }
}

fn recognize_request<'a>(audio: &[u8], config: &'a RecognitionConfig) -> RecognizeRequest<'a> {
    RecognizeRequest {
        config,
        audio: RecognitionAudio {
            content: STANDARD.encode(audio),
        },
    }
}

pub(crate) fn finish_operation(operation: Operation) -> Result<RecognizedText, PollError> {
    if !operation.done {
        return Err(PollError::Pending);
    }
    if let Some(error) = operation.error {
        warn!(code = error.code, message = %error.message, "Transcription operation failed");
        return Err(PollError::Failed(AppError::Upstream(format!(
            "Transcription failed: {}",
            error.message
        ))));
    }
    Ok(join_results(operation.response.unwrap_or_default()))
}

fn join_results(response: RecognizeResponse) -> RecognizedText {
    let best: Vec<RecognitionAlternative> = response
        .results
        .into_iter()
        .filter_map(|result| result.alternatives.into_iter().next())
        .collect();

    let text = best
        .iter()
        .map(|alt| alt.transcript.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let scores: Vec<f32> = best.iter().filter_map(|alt| alt.confidence).collect();
    let confidence = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    };

    RecognizedText { text, confidence }
}

/// Maps an audio content type to the encoding name the recognizer expects.
pub fn encoding_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/webm" | "video/webm" => Some("WEBM_OPUS"),
        "audio/ogg" | "audio/opus" => Some("OGG_OPUS"),
        "audio/flac" | "audio/x-flac" => Some("FLAC"),
        "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/l16" => Some("LINEAR16"),
        "audio/mpeg" | "audio/mp3" => Some("MP3"),
        _ => None,
    }
}
