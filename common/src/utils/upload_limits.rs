use super::config::AppConfig;
use crate::storage::types::session::IngestionMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadValidationError {
    PayloadTooLarge(String),
    BadRequest(String),
}

/// Checks that an upload carries the field its ingestion method needs, within configured limits.
pub fn validate_upload_input(
    config: &AppConfig,
    method: IngestionMethod,
    text: Option<&str>,
    url: Option<&str>,
    file_count: usize,
) -> Result<(), UploadValidationError> {
    if file_count > 1 {
        return Err(UploadValidationError::BadRequest(
            "Only one file can be uploaded per request".to_string(),
        ));
    }

    match method {
        IngestionMethod::File => {
            if file_count == 0 {
                return Err(UploadValidationError::BadRequest(
                    "A file is required for method 'file'".to_string(),
                ));
            }
        }
        IngestionMethod::Text => {
            let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
                return Err(UploadValidationError::BadRequest(
                    "Text is required for method 'text'".to_string(),
                ));
            };
            if text.len() > config.upload_max_text_bytes {
                return Err(UploadValidationError::PayloadTooLarge(format!(
                    "Text is too large. Maximum allowed is {} bytes",
                    config.upload_max_text_bytes
                )));
            }
        }
        IngestionMethod::Url => {
            if url.map_or(true, |u| u.trim().is_empty()) {
                return Err(UploadValidationError::BadRequest(
                    "A url is required for method 'url'".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_one_file() {
        let config = AppConfig::default();
        let result = validate_upload_input(&config, IngestionMethod::File, None, None, 2);

        assert!(matches!(result, Err(UploadValidationError::BadRequest(_))));
    }

    #[test]
    fn file_method_requires_file() {
        let config = AppConfig::default();
        let result = validate_upload_input(&config, IngestionMethod::File, Some("x"), None, 0);

        assert!(matches!(result, Err(UploadValidationError::BadRequest(_))));
    }

    #[test]
    fn text_method_rejects_blank_and_oversized_text() {
        let config = AppConfig {
            upload_max_text_bytes: 4,
            ..Default::default()
        };
        let blank = validate_upload_input(&config, IngestionMethod::Text, Some("   "), None, 0);
        assert!(matches!(blank, Err(UploadValidationError::BadRequest(_))));

        let big = validate_upload_input(&config, IngestionMethod::Text, Some("12345"), None, 0);
        assert!(matches!(big, Err(UploadValidationError::PayloadTooLarge(_))));
    }

    #[test]
    fn url_method_requires_url() {
        let config = AppConfig::default();
        let result = validate_upload_input(&config, IngestionMethod::Url, Some("text"), None, 0);

        assert!(matches!(result, Err(UploadValidationError::BadRequest(_))));
    }

    #[test]
    fn accepts_valid_payloads() {
        let config = AppConfig::default();
        assert!(validate_upload_input(&config, IngestionMethod::Text, Some("ok"), None, 0).is_ok());
        assert!(validate_upload_input(
            &config,
            IngestionMethod::Url,
            None,
            Some("https://jobs.example.com/1"),
            0
        )
        .is_ok());
        assert!(validate_upload_input(&config, IngestionMethod::File, None, None, 1).is_ok());
    }
}
