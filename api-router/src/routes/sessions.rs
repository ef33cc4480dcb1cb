use std::fmt::Write as _;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart};
use common::{
    error::AppError,
    storage::{
        session_store::validate_session_id,
        types::session::{ContentKind, IngestionMethod, PostingSections, SessionItem},
    },
    utils::{
        upload_limits::validate_upload_input,
        web_search::{clamp_max_results, SearchDepth, SearchResult},
    },
};
use ingestion_pipeline::IngestionPayload;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    api_state::ApiState,
    error::ApiError,
    extract::{ApiJson, ApiMultipart},
};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    pub kind: String,
    pub method: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub file: Vec<FieldData<NamedTempFile>>,
}

#[derive(Debug, Serialize)]
struct UploadedItem {
    kind: ContentKind,
    method: IngestionMethod,
    source: Option<String>,
    characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    posting: Option<PostingSections>,
}

pub async fn upload_content(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    form: ApiMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let input = form.data;
    validate_session_id(&session_id)?;
    let kind: ContentKind = input.kind.parse()?;
    let method = resolve_method(&input)?;
    let file_count = input.file.len();

    info!(
        %session_id,
        kind = %kind,
        ?method,
        file_count,
        text_bytes = input.text.as_ref().map_or(0, String::len),
        "Received upload"
    );

    validate_upload_input(
        &state.config,
        method,
        input.text.as_deref(),
        input.url.as_deref(),
        file_count,
    )?;

    let payload = build_payload(method, input)?;
    let item = state.ingestor.ingest(kind, payload).await?;
    let uploaded = UploadedItem {
        kind: item.kind,
        method: item.method,
        source: item.source.clone(),
        characters: item.text.chars().count(),
        posting: item.posting.clone(),
    };
    let session = state.sessions.upsert_item(&session_id, item).await?;

    Ok(Json(json!({
        "status": "success",
        "item": uploaded,
        "session": session.summary(),
    })))
}

/// Uses the explicit `method` field, otherwise infers it from which field was sent.
fn resolve_method(input: &UploadParams) -> Result<IngestionMethod, AppError> {
    match input.method.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(method) => method.parse(),
        None if !input.file.is_empty() => Ok(IngestionMethod::File),
        None if input.url.as_deref().is_some_and(|u| !u.trim().is_empty()) => {
            Ok(IngestionMethod::Url)
        }
        None => Ok(IngestionMethod::Text),
    }
}

fn build_payload(
    method: IngestionMethod,
    input: UploadParams,
) -> Result<IngestionPayload, AppError> {
    match method {
        IngestionMethod::File => {
            let field = input
                .file
                .into_iter()
                .next()
                .ok_or_else(|| AppError::Validation("A file is required".into()))?;
            let file_name = field
                .metadata
                .file_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = field.metadata.content_type.clone();
            Ok(IngestionPayload::File {
                file: field.contents,
                file_name,
                content_type,
            })
        }
        IngestionMethod::Text => Ok(IngestionPayload::Text {
            text: input.text.unwrap_or_default(),
        }),
        IngestionMethod::Url => Ok(IngestionPayload::Url {
            url: input.url.unwrap_or_default().trim().to_string(),
        }),
    }
}

pub async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_session_id(&session_id)?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session '{session_id}' not found")))?;

    Ok(Json(session.summary()))
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub company: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Searches the web for the company and stores the findings as the session's company info.
pub async fn research_company(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    ApiJson(request): ApiJson<ResearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_session_id(&session_id)?;
    let company = request.company.trim();
    if company.is_empty() {
        return Err(ApiError::ValidationError("company is required".to_string()));
    }

    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map_or_else(
            || format!("{company} company overview, products, culture and recent news"),
            str::to_string,
        );

    let response = state
        .search
        .search(
            &query,
            clamp_max_results(request.max_results),
            SearchDepth::Advanced,
        )
        .await?;

    if response.answer.is_none() && response.results.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No web results found for '{company}'"
        )));
    }
    let text = research_text(company, response.answer.as_deref(), &response.results);

    let item = SessionItem::new(ContentKind::CompanyInfo, IngestionMethod::Text, text)
        .with_source(format!("web search: {query}"));
    let session = state.sessions.upsert_item(&session_id, item).await?;
    info!(%session_id, company, results = response.results.len(), "Stored company research");

    Ok(Json(json!({
        "status": "success",
        "answer": response.answer,
        "results": response.results,
        "session": session.summary(),
    })))
}

fn research_text(company: &str, answer: Option<&str>, results: &[SearchResult]) -> String {
    let mut text = format!("Research notes on {company}\n");
    if let Some(answer) = answer.map(str::trim).filter(|a| !a.is_empty()) {
        let _ = write!(text, "\nSummary:\n{answer}\n");
    }
    for result in results {
        let _ = write!(
            text,
            "\n{}\n{}\n{}\n",
            result.title.trim(),
            result.url.trim(),
            result.content.trim()
        );
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_text_lists_summary_and_sources() {
        let results = vec![SearchResult {
            title: "Acme careers".into(),
            url: "https://acme.com/careers".into(),
            content: "We build rockets.".into(),
            score: 0.9,
        }];
        let text = research_text("Acme", Some("Acme is a rocket company."), &results);
        assert_eq!(
            text,
            "Research notes on Acme\n\nSummary:\nAcme is a rocket company.\n\nAcme careers\nhttps://acme.com/careers\nWe build rockets."
        );
    }
}
