use axum::{extract::State, response::IntoResponse, Json};
use common::utils::web_search::{clamp_max_results, SearchDepth};
use serde::Deserialize;

use crate::{api_state::ApiState, error::ApiError, extract::ApiJson};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub depth: SearchDepth,
}

pub async fn web_search(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::ValidationError("query is required".to_string()));
    }

    let response = state
        .search
        .search(query, clamp_max_results(request.max_results), request.depth)
        .await?;

    Ok(Json(response))
}
