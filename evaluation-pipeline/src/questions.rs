use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{
    error::AppError,
    storage::types::session::{ContentKind, Session},
    utils::{
        llm::{complete_structured, JsonPrompt, LanguageModel},
        text_cleanup::collapse_whitespace,
    },
};

use crate::{
    context::{render_session_context, MAX_ITEM_CHARS},
    instructions::{question_generation_schema, QUESTION_GENERATION_SYSTEM_MESSAGE},
};

pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const MAX_QUESTION_COUNT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct QuestionGenerationResponse {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

/// Validates a requested question count; absent means the default.
pub fn resolve_question_count(requested: Option<usize>) -> Result<usize, AppError> {
    match requested {
        None => Ok(DEFAULT_QUESTION_COUNT),
        Some(count) if (1..=MAX_QUESTION_COUNT).contains(&count) => Ok(count),
        Some(count) => Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_QUESTION_COUNT}, got {count}"
        ))),
    }
}

/// Asks the model for interview questions tailored to the session's documents.
pub async fn generate_questions<M>(
    model: &M,
    session: &Session,
    count: Option<usize>,
) -> Result<Vec<GeneratedQuestion>, AppError>
where
    M: LanguageModel + ?Sized,
{
    let count = resolve_question_count(count)?;

    if session.item(ContentKind::Resume).is_none()
        && session.item(ContentKind::JobDescription).is_none()
    {
        return Err(AppError::Validation(
            "Upload a resume or a job description before generating questions".into(),
        ));
    }

    let user = format!(
        "Write exactly {count} interview questions.\n\n{}",
        render_session_context(session, MAX_ITEM_CHARS)
    );

    let response: QuestionGenerationResponse = complete_structured(
        model,
        JsonPrompt {
            name: "interview_questions",
            system: QUESTION_GENERATION_SYSTEM_MESSAGE,
            user,
            schema: question_generation_schema(),
        },
    )
    .await?;

    let received = response.questions.len();
    let questions = clean_questions(response.questions, count);
    if questions.is_empty() {
        return Err(AppError::LLMParsing(
            "Model returned no usable questions".into(),
        ));
    }
    if questions.len() < count {
        warn!(
            requested = count,
            received,
            kept = questions.len(),
            "Model returned fewer questions than requested"
        );
    }

    info!(session_id = %session.id, count = questions.len(), "Generated interview questions");
    Ok(questions)
}

/// Trims fields, drops blank and duplicate questions (case-insensitive) and caps the list.
fn clean_questions(raw: Vec<GeneratedQuestion>, count: usize) -> Vec<GeneratedQuestion> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|q| GeneratedQuestion {
            question: collapse_whitespace(&q.question),
            category: collapse_whitespace(&q.category).to_lowercase(),
            rationale: collapse_whitespace(&q.rationale),
        })
        .filter(|q| !q.question.is_empty())
        .filter(|q| seen.insert(q.question.to_lowercase()))
        .take(count)
        .collect()
}
