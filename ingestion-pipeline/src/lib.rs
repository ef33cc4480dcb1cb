#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod ingest;
pub mod speech;
pub mod utils;

pub use ingest::{ContentIngestor, IngestionPayload};
pub use speech::{GoogleSpeech, SpeechService, SynthesisOptions, Transcript, TranscriptionOptions};
