use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// `Json` extractor whose rejections use the API's error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor whose rejections use the API's error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `TypedMultipart` whose rejections use the API's error body; the parsed form is in `data`.
pub type ApiMultipart<T> = axum_typed_multipart::BaseMultipart<T, ApiError>;
