use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A stored technical interview question with a model answer used for similarity scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceQuestion {
    pub id: String,
    pub role: String,
    pub prompt: String,
    pub reference_answer: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ReferenceQuestion {
    /// Text sent to the embedding service for this question.
    pub fn embedding_text(&self) -> &str {
        if self.reference_answer.trim().is_empty() {
            &self.prompt
        } else {
            &self.reference_answer
        }
    }
}

/// Checks the set-level invariants: ids unique, id and prompt non-empty.
pub fn validate_reference_set(questions: &[ReferenceQuestion]) -> Result<(), AppError> {
    if questions.is_empty() {
        return Err(AppError::Validation(
            "Reference question set is empty".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        if question.id.trim().is_empty() {
            return Err(AppError::Validation(
                "Reference question with empty id".to_string(),
            ));
        }
        if question.prompt.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Reference question '{}' has an empty prompt",
                question.id
            )));
        }
        if !seen.insert(question.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate reference question id '{}'",
                question.id
            )));
        }
    }

    Ok(())
}
