use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::session::Session;
use evaluation_pipeline::{
    grading::{grade_answer, grade_batch, AnswerToGrade},
    questions::generate_questions,
};
use serde::Deserialize;
use serde_json::json;

use crate::{api_state::ApiState, error::ApiError, extract::ApiJson};

#[derive(Debug, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub session_id: String,
    #[serde(default)]
    pub count: Option<usize>,
}

pub async fn generate(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, &request.session_id).await?;
    let questions = generate_questions(state.llm.as_ref(), &session, request.count).await?;

    Ok(Json(json!({
        "session_id": session.id,
        "questions": questions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn grade(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<GradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = optional_session(&state, request.session_id.as_deref()).await?;
    let grade = grade_answer(
        state.llm.as_ref(),
        &request.question,
        &request.answer,
        context.as_ref(),
    )
    .await?;

    Ok(Json(grade))
}

#[derive(Debug, Deserialize)]
pub struct GradeBatchRequest {
    pub answers: Vec<AnswerToGrade>,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn grade_many(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<GradeBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let context = optional_session(&state, request.session_id.as_deref()).await?;
    let results = grade_batch(
        state.llm.as_ref(),
        request.answers,
        context.as_ref(),
        state.config.batch_max_items,
    )
    .await?;

    Ok(Json(json!({ "results": results })))
}

async fn load_session(state: &ApiState, session_id: &str) -> Result<Session, ApiError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session '{session_id}' not found")))
}

async fn optional_session(
    state: &ApiState,
    session_id: Option<&str>,
) -> Result<Option<Session>, ApiError> {
    match session_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => load_session(state, id).await.map(Some),
        None => Ok(None),
    }
}
