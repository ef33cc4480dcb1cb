use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("LLM error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authorization error: {0}")]
    Auth(String),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl AppError {
    /// Builds an `Upstream` error from a non-success response, keeping the body for the logs.
    pub fn upstream(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        Self::Upstream(format!("{service} returned {status}: {body}"))
    }
}
