use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::AppError,
    utils::config::{AppConfig, EmbeddingBackendKind},
};

/// Cohere accepts at most this many texts per embed call.
const COHERE_MAX_BATCH: usize = 96;

/// Distinguishes stored reference texts from the candidate answers compared against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingPurpose {
    SearchDocument,
    SearchQuery,
}

#[derive(Clone)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone)]
enum EmbeddingInner {
    Cohere {
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    },
    Hashed {
        dimension: usize,
    },
}

#[derive(Serialize)]
struct CohereEmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: EmbeddingPurpose,
    embedding_types: [&'static str; 1],
}

#[derive(Deserialize)]
struct CohereEmbedResponse {
    embeddings: CohereEmbeddings,
}

#[derive(Deserialize)]
struct CohereEmbeddings {
    #[serde(default)]
    float: Vec<Vec<f32>>,
}

impl EmbeddingProvider {
    pub fn from_config(config: &AppConfig, http_client: reqwest::Client) -> Result<Self> {
        match config.embedding_backend {
            EmbeddingBackendKind::Cohere => {
                if config.cohere_api_key.trim().is_empty() {
                    return Err(anyhow!(
                        "embedding_backend is 'cohere' but cohere_api_key is not set"
                    ));
                }
                Ok(Self::new_cohere(
                    http_client,
                    &config.cohere_base_url,
                    &config.cohere_api_key,
                    &config.cohere_embed_model,
                ))
            }
            EmbeddingBackendKind::Hashed => Ok(Self::new_hashed(config.embedding_dimension)),
        }
    }

    pub fn new_cohere(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            inner: EmbeddingInner::Cohere {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
                model: model.to_string(),
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Self {
        Self {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Cohere { .. } => "cohere",
            EmbeddingInner::Hashed { .. } => "hashed",
        }
    }

    pub async fn embed(&self, text: &str, purpose: EmbeddingPurpose) -> Result<Vec<f32>, AppError> {
        self.embed_batch(vec![text.to_owned()], purpose)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Upstream("Embedding service returned no vector".into()))
    }

    pub async fn embed_batch(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
            EmbeddingInner::Cohere {
                client,
                base_url,
                api_key,
                model,
            } => {
                let mut vectors = Vec::with_capacity(texts.len());
                for chunk in texts.chunks(COHERE_MAX_BATCH) {
                    let request = CohereEmbedRequest {
                        model,
                        texts: chunk,
                        input_type: purpose,
                        embedding_types: ["float"],
                    };

                    let response = client
                        .post(format!("{base_url}/v2/embed"))
                        .bearer_auth(api_key)
                        .json(&request)
                        .send()
                        .await?;

                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(AppError::upstream("Cohere embed", status, &body));
                    }

                    let parsed: CohereEmbedResponse = response.json().await?;
                    if parsed.embeddings.float.len() != chunk.len() {
                        return Err(AppError::Upstream(format!(
                            "Cohere returned {} embeddings for {} texts",
                            parsed.embeddings.float.len(),
                            chunk.len()
                        )));
                    }
                    vectors.extend(parsed.embeddings.float);
                }

                debug!(count = vectors.len(), "Embeddings created with Cohere");
                Ok(vectors)
            }
        }
    }
}

/// Cosine similarity of two vectors; zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    for token in tokens(text) {
        if let Some(slot) = vector.get_mut(bucket(&token, dim)) {
            *slot += 1.0;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}
