use std::path::Path;

use tracing::debug;

use common::error::AppError;

const MIN_TEXT_LEN: usize = 80;
const MIN_LETTER_RATIO: f64 = 0.3;

/// Extracts the text layer of a PDF. Scanned documents without a usable text layer are rejected.
pub async fn extract_pdf_text(file_path: &Path) -> Result<String, AppError> {
    let pdf_bytes = tokio::fs::read(file_path).await?;

    let extraction = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf_bytes).map(|s| s.trim().to_string())
    })
    .await?
    .map_err(|err| AppError::Validation(format!("Failed to extract text from PDF: {err}")))?;

    if !looks_good_enough(&extraction) {
        debug!(chars = extraction.len(), "PDF text layer rejected by heuristics");
        return Err(AppError::Validation(
            "PDF has no readable text layer; upload a text-based PDF or paste the text".into(),
        ));
    }

    Ok(reflow_text(&extraction))
}

/// Cheap check that a text layer is real prose rather than empty or glyph noise.
fn looks_good_enough(text: &str) -> bool {
    if text.len() < MIN_TEXT_LEN {
        return false;
    }

    let total_chars = text.chars().filter(|c| !c.is_whitespace()).count() as f64;
    if total_chars == 0.0 {
        return false;
    }

    let letters = text.chars().filter(|c| c.is_alphabetic()).count() as f64;
    letters / total_chars > MIN_LETTER_RATIO
}

/// Joins hard-wrapped lines into paragraphs while keeping list items on their own line.
fn reflow_text(input: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            continue;
        }

        if is_structural_line(trimmed) {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            paragraphs.push(trimmed.to_string());
            continue;
        }

        buffer.push(trimmed);
    }

    if !buffer.is_empty() {
        paragraphs.push(buffer.join(" "));
    }

    paragraphs.join("\n")
}

/// Bullets, numbered items and short heading-like lines stay on their own.
fn is_structural_line(line: &str) -> bool {
    line.starts_with(['-', '*', '•', '#', '>'])
        || line.ends_with(':')
        || (line.chars().next().is_some_and(|c| c.is_ascii_digit()) && line.contains('.'))
        || (line.len() <= 40 && line.chars().any(char::is_alphabetic) && line == line.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_or_noisy_text() {
        assert!(!looks_good_enough("too short"));
        assert!(!looks_good_enough(&"0123456789 ".repeat(20)));
    }

    #[test]
    fn accepts_prose() {
        let text = "Experienced backend engineer with eight years building distributed \
        systems in Rust and Go, leading teams and shipping reliable services.";
        assert!(looks_good_enough(text));
    }

    #[test]
    fn reflow_joins_wrapped_lines_and_keeps_structure() {
        let input = "EXPERIENCE\nBuilt a payment\nplatform at Acme\n\n- Led team of 5\n• Cut latency 40%\nSkills:\nRust, Go";
        let output = reflow_text(input);
        assert_eq!(
            output,
            "EXPERIENCE\nBuilt a payment platform at Acme\n- Led team of 5\n• Cut latency 40%\nSkills:\nRust, Go"
        );
    }

    #[tokio::test]
    async fn invalid_pdf_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"definitely not a pdf").unwrap();
        let result = extract_pdf_text(file.path()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
