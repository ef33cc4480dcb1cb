use std::path::Path;

use tracing::{debug, info};

use common::error::AppError;

use super::{pdf_ingestion::extract_pdf_text, url_text_retrieval::html_to_text};

/// Document formats an uploaded file can be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Html,
}

/// Resolves the document format from the declared content type, falling back to the
/// file extension when the client sent nothing useful.
pub fn detect_format(file_name: &str, content_type: Option<&str>) -> Option<DocumentFormat> {
    let declared = content_type
        .and_then(|raw| raw.parse::<mime::Mime>().ok())
        .filter(|m| *m != mime::APPLICATION_OCTET_STREAM);

    let media = declared.or_else(|| mime_guess::from_path(file_name).first())?;
    let subtype = media.subtype().as_str();

    if media.type_() == mime::APPLICATION {
        match subtype {
            "pdf" => Some(DocumentFormat::Pdf),
            "xhtml+xml" => Some(DocumentFormat::Html),
            "json" | "markdown" | "x-markdown" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    } else if media.type_() == mime::TEXT {
        if subtype == "html" {
            Some(DocumentFormat::Html)
        } else {
            Some(DocumentFormat::PlainText)
        }
    } else {
        None
    }
}

/// Reads the text of an uploaded document stored at `path`.
pub async fn extract_text_from_upload(
    path: &Path,
    file_name: &str,
    content_type: Option<&str>,
) -> Result<String, AppError> {
    let Some(format) = detect_format(file_name, content_type) else {
        return Err(AppError::Validation(format!(
            "Unsupported file type for '{file_name}'. Upload a PDF, text, markdown or HTML file"
        )));
    };
    debug!(file_name, ?format, "Extracting text from upload");

    let text = match format {
        DocumentFormat::Pdf => extract_pdf_text(path).await?,
        DocumentFormat::PlainText => read_utf8(path, file_name).await?,
        DocumentFormat::Html => {
            let html = read_utf8(path, file_name).await?;
            html_to_text(&html)?.1
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(format!(
            "No readable text found in '{file_name}'"
        )));
    }

    info!(file_name, chars = text.len(), "Extracted text from upload");
    Ok(text)
}

async fn read_utf8(path: &Path, file_name: &str) -> Result<String, AppError> {
    let bytes = tokio::fs::read(path).await?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation(format!("'{file_name}' is not valid UTF-8 text")))
}
