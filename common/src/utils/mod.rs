pub mod auth;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod text_cleanup;
pub mod upload_limits;
pub mod web_search;
