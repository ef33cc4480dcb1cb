pub mod audio_transcription;
pub mod file_text_extraction;
pub mod pdf_ingestion;
pub mod posting_sections;
pub mod speech_synthesis;
pub mod url_text_retrieval;
