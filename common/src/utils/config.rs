use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    #[default]
    Cohere,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub cors_allow_origin: Option<String>,

    // Supabase auth
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default = "default_true")]
    pub require_auth: bool,

    // Gemini, reached through its OpenAI-compatible endpoint
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    // Embeddings
    #[serde(default)]
    pub embedding_backend: EmbeddingBackendKind,
    #[serde(default)]
    pub cohere_api_key: String,
    #[serde(default = "default_cohere_base_url")]
    pub cohere_base_url: String,
    #[serde(default = "default_cohere_embed_model")]
    pub cohere_embed_model: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    // Google Cloud speech
    #[serde(default)]
    pub google_api_key: String,
    #[serde(default = "default_speech_base_url")]
    pub speech_base_url: String,
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,
    #[serde(default = "default_speech_language_code")]
    pub speech_language_code: String,
    #[serde(default = "default_tts_voice_name")]
    pub tts_voice_name: String,
    #[serde(default = "default_speech_sync_max_bytes")]
    pub speech_sync_max_bytes: usize,
    #[serde(default = "default_speech_poll_interval_ms")]
    pub speech_poll_interval_ms: u64,
    #[serde(default = "default_speech_poll_max_attempts")]
    pub speech_poll_max_attempts: usize,

    // Tavily
    #[serde(default)]
    pub tavily_api_key: String,
    #[serde(default = "default_tavily_base_url")]
    pub tavily_base_url: String,

    // Limits
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
    #[serde(default = "default_upload_max_text_bytes")]
    pub upload_max_text_bytes: usize,
    #[serde(default = "default_external_timeout_secs")]
    pub external_timeout_secs: u64,
    #[serde(default = "default_batch_max_items")]
    pub batch_max_items: usize,

    // Technical answer scoring
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
    #[serde(default)]
    pub reference_questions_path: Option<String>,
}

const fn default_http_port() -> u16 {
    3000
}

const fn default_true() -> bool {
    true
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_cohere_base_url() -> String {
    "https://api.cohere.com".to_string()
}

fn default_cohere_embed_model() -> String {
    "embed-english-v3.0".to_string()
}

const fn default_embedding_dimension() -> usize {
    1024
}

fn default_speech_base_url() -> String {
    "https://speech.googleapis.com".to_string()
}

fn default_tts_base_url() -> String {
    "https://texttospeech.googleapis.com".to_string()
}

fn default_speech_language_code() -> String {
    "en-US".to_string()
}

fn default_tts_voice_name() -> String {
    "en-US-Neural2-F".to_string()
}

const fn default_speech_sync_max_bytes() -> usize {
    1024 * 1024
}

const fn default_speech_poll_interval_ms() -> u64 {
    2_000
}

const fn default_speech_poll_max_attempts() -> usize {
    30
}

fn default_tavily_base_url() -> String {
    "https://api.tavily.com".to_string()
}

const fn default_upload_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_upload_max_text_bytes() -> usize {
    200_000
}

const fn default_external_timeout_secs() -> u64 {
    30
}

const fn default_batch_max_items() -> usize {
    20
}

const fn default_semantic_weight() -> f32 {
    0.7
}

const fn default_keyword_weight() -> f32 {
    0.3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allow_origin: None,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            require_auth: default_true(),
            gemini_api_key: String::new(),
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            embedding_backend: EmbeddingBackendKind::default(),
            cohere_api_key: String::new(),
            cohere_base_url: default_cohere_base_url(),
            cohere_embed_model: default_cohere_embed_model(),
            embedding_dimension: default_embedding_dimension(),
            google_api_key: String::new(),
            speech_base_url: default_speech_base_url(),
            tts_base_url: default_tts_base_url(),
            speech_language_code: default_speech_language_code(),
            tts_voice_name: default_tts_voice_name(),
            speech_sync_max_bytes: default_speech_sync_max_bytes(),
            speech_poll_interval_ms: default_speech_poll_interval_ms(),
            speech_poll_max_attempts: default_speech_poll_max_attempts(),
            tavily_api_key: String::new(),
            tavily_base_url: default_tavily_base_url(),
            upload_max_body_bytes: default_upload_max_body_bytes(),
            upload_max_text_bytes: default_upload_max_text_bytes(),
            external_timeout_secs: default_external_timeout_secs(),
            batch_max_items: default_batch_max_items(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            reference_questions_path: None,
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
