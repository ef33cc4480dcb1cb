use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::AppError, utils::config::AppConfig};

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        depth: SearchDepth,
    ) -> Result<SearchResponse, AppError>;
}

pub struct TavilySearch {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: SearchDepth,
    include_answer: bool,
}

impl TavilySearch {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        Self::new(client, &config.tavily_base_url, &config.tavily_api_key)
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        depth: SearchDepth,
    ) -> Result<SearchResponse, AppError> {
        let request = TavilyRequest {
            query,
            max_results,
            search_depth: depth,
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("Tavily search", status, &body));
        }

        let mut parsed: SearchResponse = response.json().await?;
        parsed.results = dedupe_by_url(parsed.results);
        info!(query, results = parsed.results.len(), "Web search completed");
        Ok(parsed)
    }
}

/// Clamps a requested result count into `1..=MAX_RESULTS_LIMIT`.
pub fn clamp_max_results(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT)
}

/// Drops results whose URL (ignoring trailing slash and case) was already seen.
pub fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| !result.url.trim().is_empty())
        .filter(|result| seen.insert(result.url.trim().trim_end_matches('/').to_lowercase()))
        .collect()
}
