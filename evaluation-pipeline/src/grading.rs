use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{
    error::AppError,
    storage::types::session::Session,
    utils::{
        llm::{complete_structured, JsonPrompt, LanguageModel},
        text_cleanup::dedupe_case_insensitive,
    },
};

use crate::{
    context::render_session_context,
    instructions::{answer_grading_schema, ANSWER_GRADING_SYSTEM_MESSAGE},
};

/// Role context placed in grading prompts is kept shorter than for question generation.
const GRADING_CONTEXT_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerGrade {
    pub score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
struct GradingResponse {
    score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnswerToGrade {
    pub question: String,
    pub answer: String,
}

/// Outcome for one entry of a batch; exactly one of `grade` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchGradeItem {
    pub index: usize,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<AnswerGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn grade_answer<M>(
    model: &M,
    question: &str,
    answer: &str,
    context: Option<&Session>,
) -> Result<AnswerGrade, AppError>
where
    M: LanguageModel + ?Sized,
{
    let question = question.trim();
    let answer = answer.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question must not be empty".into()));
    }
    if answer.is_empty() {
        return Err(AppError::Validation("Answer must not be empty".into()));
    }

    let mut user = format!("Question:\n{question}\n\nCandidate answer:\n{answer}");
    if let Some(session) = context.filter(|s| !s.is_empty()) {
        user.push_str("\n\nRole context:\n");
        user.push_str(&render_session_context(session, GRADING_CONTEXT_CHARS));
    }

    let response: GradingResponse = complete_structured(
        model,
        JsonPrompt {
            name: "answer_grade",
            system: ANSWER_GRADING_SYSTEM_MESSAGE,
            user,
            schema: answer_grading_schema(),
        },
    )
    .await?;

    let grade = AnswerGrade {
        score: clamp_score(response.score),
        strengths: dedupe_case_insensitive(response.strengths),
        improvements: dedupe_case_insensitive(response.improvements),
        feedback: response.feedback.trim().to_string(),
    };
    info!(score = grade.score, "Answer graded");
    Ok(grade)
}

/// Grades each answer in turn. A failing entry is reported in place and does not stop the rest.
pub async fn grade_batch<M>(
    model: &M,
    answers: Vec<AnswerToGrade>,
    context: Option<&Session>,
    max_items: usize,
) -> Result<Vec<BatchGradeItem>, AppError>
where
    M: LanguageModel + ?Sized,
{
    if answers.is_empty() {
        return Err(AppError::Validation("answers must not be empty".into()));
    }
    if answers.len() > max_items {
        return Err(AppError::Validation(format!(
            "At most {max_items} answers can be graded per request"
        )));
    }

    let mut results = Vec::with_capacity(answers.len());
    for (index, item) in answers.into_iter().enumerate() {
        let outcome = grade_answer(model, &item.question, &item.answer, context).await;
        let (grade, error) = match outcome {
            Ok(grade) => (Some(grade), None),
            Err(err) => {
                warn!(index, error = %err, "Batch item grading failed");
                (None, Some(err.to_string()))
            }
        };
        results.push(BatchGradeItem {
            index,
            question: item.question,
            grade,
            error,
        });
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    info!(total = results.len(), failed, "Batch grading finished");
    Ok(results)
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_finite() {
        raw.round().clamp(1.0, 10.0) as u8
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use common::storage::types::session::{ContentKind, IngestionMethod, SessionItem};

    use super::*;

    /// Replays canned answers in order, capturing the user prompts it saw.
    struct ScriptedModel {
        answers: Vec<&'static str>,
        calls: AtomicUsize,
        last_prompt: std::sync::Mutex<String>,
    }

    impl ScriptedModel {
        fn new(answers: Vec<&'static str>) -> Self {
            Self {
                answers,
                calls: AtomicUsize::new(0),
                last_prompt: std::sync::Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete_json(&self, prompt: JsonPrompt<'_>) -> Result<String, AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.user;
            self.answers
                .get(call)
                .map(|a| a.to_string())
                .ok_or_else(|| AppError::Upstream("no more answers".into()))
        }
    }

    const GOOD: &str = r#"{"score": 8.4, "strengths": ["Clear STAR structure", "clear star structure"], "improvements": ["Quantify impact"], "feedback": " Solid answer. "}"#;

    #[tokio::test]
    async fn grades_and_cleans_response() {
        let model = ScriptedModel::new(vec![GOOD]);
        let grade = grade_answer(&model, "Tell me about a conflict", "I listened first", None)
            .await
            .expect("grade");

        assert_eq!(grade.score, 8);
        assert_eq!(grade.strengths, vec!["Clear STAR structure"]);
        assert_eq!(grade.improvements, vec!["Quantify impact"]);
        assert_eq!(grade.feedback, "Solid answer.");
    }

    #[tokio::test]
    async fn clamps_out_of_range_scores() {
        let model = ScriptedModel::new(vec![
            r#"{"score": 42, "strengths": [], "improvements": [], "feedback": ""}"#,
            r#"{"score": -3, "strengths": [], "improvements": [], "feedback": ""}"#,
        ]);
        let high = grade_answer(&model, "q", "a", None).await.expect("high");
        let low = grade_answer(&model, "q", "a", None).await.expect("low");
        assert_eq!(high.score, 10);
        assert_eq!(low.score, 1);
    }

    #[tokio::test]
    async fn includes_role_context_when_present() {
        let model = ScriptedModel::new(vec![GOOD]);
        let mut session = Session::new("s1");
        session.items.insert(
            ContentKind::JobDescription,
            SessionItem::new(
                ContentKind::JobDescription,
                IngestionMethod::Text,
                "Staff engineer, payments".into(),
            ),
        );

        grade_answer(&model, "Why payments?", "I like money", Some(&session))
            .await
            .expect("grade");
        let prompt = model.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Role context"));
        assert!(prompt.contains("Staff engineer, payments"));
    }

    #[tokio::test]
    async fn empty_answer_is_rejected() {
        let model = ScriptedModel::new(vec![GOOD]);
        let err = grade_answer(&model, "q", "  ", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_reports_failures_in_place() {
        let model = ScriptedModel::new(vec![GOOD, "not json at all"]);
        let answers = vec![
            AnswerToGrade {
                question: "q1".into(),
                answer: "a1".into(),
            },
            AnswerToGrade {
                question: "q2".into(),
                answer: "   ".into(),
            },
            AnswerToGrade {
                question: "q3".into(),
                answer: "a3".into(),
            },
        ];

        let results = grade_batch(&model, answers, None, 20).await.expect("batch");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].grade.as_ref().map(|g| g.score), Some(8));
        assert!(results[1].error.as_deref().unwrap().contains("Answer must not be empty"));
        assert!(results[2].grade.is_none());
        assert!(results[2].error.is_some());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_limits() {
        let model = ScriptedModel::new(vec![]);
        assert!(matches!(
            grade_batch(&model, Vec::new(), None, 5).await,
            Err(AppError::Validation(_))
        ));

        let too_many = (0..3)
            .map(|i| AnswerToGrade {
                question: format!("q{i}"),
                answer: "a".into(),
            })
            .collect();
        assert!(matches!(
            grade_batch(&model, too_many, None, 2).await,
            Err(AppError::Validation(_))
        ));
    }
}
