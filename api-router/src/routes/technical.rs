use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{
    api_state::ApiState,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
};

#[derive(Debug, Deserialize)]
pub struct QuestionFilter {
    #[serde(default)]
    pub role: Option<String>,
}

pub async fn list_questions(
    State(state): State<ApiState>,
    ApiQuery(filter): ApiQuery<QuestionFilter>,
) -> impl IntoResponse {
    let questions = state.evaluator.questions(filter.role.as_deref());
    Json(json!({ "questions": questions }))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub question_id: String,
    pub answer: String,
}

pub async fn evaluate(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<EvaluateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let evaluation = state
        .evaluator
        .evaluate(&request.question_id, &request.answer)
        .await?;

    Ok(Json(evaluation))
}
