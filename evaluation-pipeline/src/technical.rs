use std::{collections::HashMap, sync::Arc, time::Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use common::{
    error::AppError,
    utils::embedding::{cosine_similarity, EmbeddingProvider, EmbeddingPurpose},
};

use crate::{
    reference_set::ReferenceSet,
    scoring::{blend, keyword_overlap, rating_label, score_band, ScoreWeights},
};

/// Public view of a reference question; the model answer and keywords stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicalQuestion {
    pub id: String,
    pub role: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalEvaluation {
    pub question_id: String,
    pub semantic_similarity: f32,
    /// `None` when the question carries no keywords.
    pub keyword_score: Option<f32>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub blended_score: f32,
    pub score: u8,
    pub rating: &'static str,
}

/// Scores free-text answers against embedded reference answers.
///
/// Reference vectors are fetched once by [`TechnicalEvaluator::initialize`]. When that fails
/// at startup, the next evaluation retries it.
pub struct TechnicalEvaluator {
    references: Arc<ReferenceSet>,
    embeddings: EmbeddingProvider,
    weights: ScoreWeights,
    vectors: RwLock<Option<Arc<HashMap<String, Vec<f32>>>>>,
    init_guard: Mutex<()>,
}

impl TechnicalEvaluator {
    pub fn new(
        references: Arc<ReferenceSet>,
        embeddings: EmbeddingProvider,
        weights: ScoreWeights,
    ) -> Self {
        Self {
            references,
            embeddings,
            weights,
            vectors: RwLock::new(None),
            init_guard: Mutex::new(()),
        }
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub async fn is_ready(&self) -> bool {
        self.vectors.read().await.is_some()
    }

    /// Embeds every reference answer, one request at a time.
    pub async fn initialize(&self) -> Result<(), AppError> {
        let _guard = self.init_guard.lock().await;
        if self.is_ready().await {
            return Ok(());
        }

        let started = Instant::now();
        let mut vectors = HashMap::with_capacity(self.references.len());
        for question in self.references.questions() {
            let vector = self
                .embeddings
                .embed(question.embedding_text(), EmbeddingPurpose::SearchDocument)
                .await
                .map_err(|err| {
                    warn!(question_id = %question.id, error = %err, "Reference embedding failed");
                    AppError::Unavailable(format!(
                        "Reference answers could not be embedded: {err}"
                    ))
                })?;
            vectors.insert(question.id.clone(), vector);
        }

        info!(
            questions = vectors.len(),
            backend = self.embeddings.backend_label(),
            elapsed = ?started.elapsed(),
            "Reference vectors loaded"
        );
        *self.vectors.write().await = Some(Arc::new(vectors));
        Ok(())
    }

    pub fn questions(&self, role: Option<&str>) -> Vec<TechnicalQuestion> {
        let selected = match role.filter(|r| !r.trim().is_empty()) {
            Some(role) => self.references.by_role(role),
            None => self.references.questions().iter().collect(),
        };

        selected
            .into_iter()
            .map(|q| TechnicalQuestion {
                id: q.id.clone(),
                role: q.role.clone(),
                prompt: q.prompt.clone(),
            })
            .collect()
    }

    pub async fn evaluate(
        &self,
        question_id: &str,
        answer: &str,
    ) -> Result<TechnicalEvaluation, AppError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::Validation("Answer must not be empty".into()));
        }

        let question = self.references.get(question_id).ok_or_else(|| {
            AppError::NotFound(format!("Unknown technical question '{question_id}'"))
        })?;

        let vectors = self.vectors().await?;
        let reference = vectors.get(&question.id).ok_or_else(|| {
            AppError::Unavailable(format!("No reference vector for '{question_id}'"))
        })?;

        let answer_vector = self
            .embeddings
            .embed(answer, EmbeddingPurpose::SearchQuery)
            .await?;

        let semantic = cosine_similarity(&answer_vector, reference).max(0.0);
        let coverage = keyword_overlap(&question.keywords, answer);
        let keyword_score = coverage.ratio();
        let blended = blend(semantic, keyword_score, self.weights);
        let score = score_band(blended);

        info!(
            question_id,
            semantic,
            keyword_score = ?keyword_score,
            blended,
            score,
            "Technical answer evaluated"
        );

        Ok(TechnicalEvaluation {
            question_id: question.id.clone(),
            semantic_similarity: semantic,
            keyword_score,
            matched_keywords: coverage.matched,
            missing_keywords: coverage.missing,
            blended_score: blended,
            score,
            rating: rating_label(score),
        })
    }

    async fn vectors(&self) -> Result<Arc<HashMap<String, Vec<f32>>>, AppError> {
        if let Some(vectors) = self.vectors.read().await.as_ref() {
            return Ok(Arc::clone(vectors));
        }

        info!("Reference vectors missing, retrying initialization");
        self.initialize().await?;

        self.vectors
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| AppError::Unavailable("Reference vectors are not loaded".into()))
    }
}

#[cfg(test)]
mod tests {
    use common::storage::types::reference_question::ReferenceQuestion;

    use super::*;

    fn reference_set() -> Arc<ReferenceSet> {
        Arc::new(
            ReferenceSet::new(vec![
                ReferenceQuestion {
                    id: "q-mutex".into(),
                    role: "backend".into(),
                    prompt: "How do you prevent a race condition?".into(),
                    reference_answer: "Protect shared state with a mutex or use atomic operations"
                        .into(),
                    keywords: vec!["mutex".into(), "atomic".into()],
                },
                ReferenceQuestion {
                    id: "q-open".into(),
                    role: "general".into(),
                    prompt: "Tell me about a project you are proud of".into(),
                    reference_answer: String::new(),
                    keywords: vec![],
                },
            ])
            .expect("valid set"),
        )
    }

    fn evaluator() -> TechnicalEvaluator {
        TechnicalEvaluator::new(
            reference_set(),
            EmbeddingProvider::new_hashed(256),
            ScoreWeights::default(),
        )
    }

    #[tokio::test]
    async fn initialize_marks_ready() {
        let evaluator = evaluator();
        assert!(!evaluator.is_ready().await);
        evaluator.initialize().await.expect("init");
        assert!(evaluator.is_ready().await);
        evaluator.initialize().await.expect("second init is a no-op");
    }

    #[tokio::test]
    async fn evaluate_lazily_initializes() {
        let evaluator = evaluator();
        let result = evaluator
            .evaluate(
                "q-mutex",
                "Protect shared state with a mutex or use atomic operations",
            )
            .await
            .expect("evaluation");

        assert!(evaluator.is_ready().await);
        assert!(result.semantic_similarity > 0.99);
        assert_eq!(result.keyword_score, Some(1.0));
        assert_eq!(result.score, 10);
        assert_eq!(result.rating, "excellent");
    }

    #[tokio::test]
    async fn weak_answer_scores_lower() {
        let evaluator = evaluator();
        let strong = evaluator
            .evaluate("q-mutex", "Use a mutex around shared state, or atomic counters")
            .await
            .expect("strong");
        let weak = evaluator
            .evaluate("q-mutex", "I would restart the server")
            .await
            .expect("weak");

        assert!(weak.blended_score < strong.blended_score);
        assert_eq!(weak.matched_keywords, Vec::<String>::new());
        assert_eq!(weak.missing_keywords, vec!["mutex", "atomic"]);
    }

    #[tokio::test]
    async fn question_without_keywords_uses_semantic_only() {
        let evaluator = evaluator();
        let result = evaluator
            .evaluate("q-open", "A search engine for my team's documents")
            .await
            .expect("evaluation");
        assert_eq!(result.keyword_score, None);
        assert!((result.blended_score - result.semantic_similarity).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unknown_question_and_empty_answer() {
        let evaluator = evaluator();
        assert!(matches!(
            evaluator.evaluate("nope", "answer").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            evaluator.evaluate("q-mutex", "   ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_embedding_service_is_unavailable() {
        let evaluator = TechnicalEvaluator::new(
            reference_set(),
            EmbeddingProvider::new_cohere(
                reqwest::Client::new(),
                "http://127.0.0.1:9",
                "key",
                "model",
            ),
            ScoreWeights::default(),
        );

        assert!(matches!(
            evaluator.initialize().await,
            Err(AppError::Unavailable(_))
        ));
        assert!(!evaluator.is_ready().await);
        assert!(matches!(
            evaluator.evaluate("q-mutex", "mutex").await,
            Err(AppError::Unavailable(_))
        ));
    }

    #[test]
    fn lists_questions_by_role() {
        let evaluator = evaluator();
        assert_eq!(evaluator.questions(None).len(), 2);
        let backend = evaluator.questions(Some("backend"));
        assert_eq!(backend.len(), 1);
        assert_eq!(backend[0].id, "q-mutex");
        assert_eq!(evaluator.questions(Some("  ")).len(), 2);
    }
}
