use std::{sync::Arc, time::Duration};

use common::{
    storage::session_store::SessionStore,
    utils::{
        auth::{AuthProvider, SupabaseAuth},
        config::AppConfig,
        embedding::EmbeddingProvider,
        llm::{GeminiModel, LanguageModel},
        web_search::{TavilySearch, WebSearch},
    },
};
use evaluation_pipeline::{scoring::ScoreWeights, ReferenceSet, TechnicalEvaluator};
use ingestion_pipeline::{ContentIngestor, GoogleSpeech, SpeechService};

/// External services the handlers talk to, behind trait objects so tests can swap them.
#[derive(Clone)]
pub struct ApiServices {
    pub llm: Arc<dyn LanguageModel>,
    pub auth: Arc<dyn AuthProvider>,
    pub search: Arc<dyn WebSearch>,
    pub speech: Arc<dyn SpeechService>,
    pub evaluator: Arc<TechnicalEvaluator>,
    pub ingestor: ContentIngestor,
}

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub llm: Arc<dyn LanguageModel>,
    pub auth: Arc<dyn AuthProvider>,
    pub search: Arc<dyn WebSearch>,
    pub speech: Arc<dyn SpeechService>,
    pub evaluator: Arc<TechnicalEvaluator>,
    pub ingestor: ContentIngestor,
}

impl ApiState {
    pub fn new(config: &AppConfig, services: ApiServices) -> Self {
        Self {
            config: config.clone(),
            sessions: SessionStore::new(),
            llm: services.llm,
            auth: services.auth,
            search: services.search,
            speech: services.speech,
            evaluator: services.evaluator,
            ingestor: services.ingestor,
        }
    }

    /// Builds the production clients, all sharing one HTTP client with the per-call timeout.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.external_timeout_secs))
            .build()?;

        let references = Arc::new(
            ReferenceSet::load(config.reference_questions_path.as_deref()).await?,
        );
        let embeddings = EmbeddingProvider::from_config(config, http_client.clone())?;
        let evaluator = Arc::new(TechnicalEvaluator::new(
            references,
            embeddings,
            ScoreWeights::from_config(config),
        ));

        let services = ApiServices {
            llm: Arc::new(GeminiModel::from_config(config, http_client.clone())),
            auth: Arc::new(SupabaseAuth::from_config(config, http_client.clone())),
            search: Arc::new(TavilySearch::from_config(config, http_client.clone())),
            speech: Arc::new(GoogleSpeech::from_config(config, http_client.clone())),
            evaluator,
            ingestor: ContentIngestor::from_config(config, http_client),
        };

        Ok(Self::new(config, services))
    }
}
