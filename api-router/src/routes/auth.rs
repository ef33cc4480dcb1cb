use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use common::utils::auth::Credentials;
use serde_json::json;
use tracing::info;

use crate::{
    api_state::ApiState, error::ApiError, extract::ApiJson, middleware_api_auth::bearer_token,
};

pub async fn sign_up(
    State(state): State<ApiState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    credentials.validate()?;
    let outcome = state.auth.sign_up(&credentials).await?;
    info!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "Sign-up completed");

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn sign_in(
    State(state): State<ApiState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    credentials.validate()?;
    let session = state.auth.sign_in(&credentials).await?;

    Ok(Json(session))
}

pub async fn sign_out(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers)?;
    state.auth.sign_out(&token).await?;

    Ok(Json(json!({ "status": "success" })))
}

pub async fn current_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_token(&headers)?;
    let user = state.auth.get_user(&token).await?;

    Ok(Json(user))
}

fn require_token(headers: &HeaderMap) -> Result<String, ApiError> {
    bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("You have to be authenticated".to_string()))
}
