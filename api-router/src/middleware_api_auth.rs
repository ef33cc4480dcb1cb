use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use common::error::AppError;
use tracing::debug;

use crate::{api_state::ApiState, error::ApiError};

pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.require_auth {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("You have to be authenticated".to_string()))?;

    let user = state
        .auth
        .get_user(&token)
        .await
        .map_err(|err| match err {
            AppError::Auth(_) | AppError::Validation(_) => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            other => ApiError::from(other),
        })?;
    debug!(user_id = %user.id, "Authenticated request");

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}
