use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 once reference vectors are loaded, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    if state.evaluator.is_ready().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "reference_vectors": "ok" }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "reference_vectors": "fail" },
                "reason": "Reference answers have not been embedded yet"
            })),
        )
    }
}
