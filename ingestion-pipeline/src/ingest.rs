use tempfile::NamedTempFile;
use tracing::{info, warn};

use common::{
    error::AppError,
    storage::types::session::{ContentKind, IngestionMethod, SessionItem},
    utils::{config::AppConfig, text_cleanup::truncate_bytes},
};

use crate::utils::{
    file_text_extraction::extract_text_from_upload, posting_sections::extract_posting_sections,
    url_text_retrieval::fetch_url_text,
};

/// Raw content submitted for one session slot.
#[derive(Debug)]
pub enum IngestionPayload {
    File {
        file: NamedTempFile,
        file_name: String,
        content_type: Option<String>,
    },
    Text {
        text: String,
    },
    Url {
        url: String,
    },
}

impl IngestionPayload {
    pub fn method(&self) -> IngestionMethod {
        match self {
            Self::File { .. } => IngestionMethod::File,
            Self::Text { .. } => IngestionMethod::Text,
            Self::Url { .. } => IngestionMethod::Url,
        }
    }
}

/// Turns uploads into session items.
#[derive(Clone)]
pub struct ContentIngestor {
    http_client: reqwest::Client,
    max_text_bytes: usize,
}

impl ContentIngestor {
    pub fn new(http_client: reqwest::Client, max_text_bytes: usize) -> Self {
        Self {
            http_client,
            max_text_bytes,
        }
    }

    pub fn from_config(config: &AppConfig, http_client: reqwest::Client) -> Self {
        Self::new(http_client, config.upload_max_text_bytes)
    }

    pub async fn ingest(
        &self,
        kind: ContentKind,
        payload: IngestionPayload,
    ) -> Result<SessionItem, AppError> {
        let method = payload.method();

        let (text, source) = match payload {
            IngestionPayload::File {
                file,
                file_name,
                content_type,
            } => {
                let text =
                    extract_text_from_upload(file.path(), &file_name, content_type.as_deref())
                        .await?;
                (text, Some(file_name))
            }
            IngestionPayload::Text { text } => (text.trim().to_string(), None),
            IngestionPayload::Url { url } => {
                let page = fetch_url_text(&self.http_client, &url).await?;
                (page.text, Some(page.url))
            }
        };

        if text.is_empty() {
            return Err(AppError::Validation(format!(
                "No text could be extracted for {}",
                kind.label()
            )));
        }

        let text = if text.len() > self.max_text_bytes {
            warn!(
                kind = %kind,
                bytes = text.len(),
                limit = self.max_text_bytes,
                "Truncating ingested text"
            );
            truncate_bytes(&text, self.max_text_bytes).to_string()
        } else {
            text
        };

        let mut item = SessionItem::new(kind, method, text);
        if let Some(source) = source {
            item = item.with_source(source);
        }

        if kind == ContentKind::JobDescription {
            let posting = extract_posting_sections(&item.text);
            info!(
                responsibilities = posting.responsibilities.len(),
                qualifications = posting.qualifications.len(),
                "Parsed job posting sections"
            );
            item = item.with_posting(posting);
        }

        info!(kind = %kind, method = ?method, bytes = item.text.len(), "Ingested content");
        Ok(item)
    }
}
