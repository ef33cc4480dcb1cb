use std::{collections::HashMap, path::Path};

use tracing::info;

use common::{
    error::AppError,
    storage::types::reference_question::{validate_reference_set, ReferenceQuestion},
};

const BUILT_IN_QUESTIONS: &str = include_str!("../data/reference_questions.json");

/// Validated, immutable list of technical reference questions.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    questions: Vec<ReferenceQuestion>,
    index: HashMap<String, usize>,
}

impl ReferenceSet {
    pub fn new(questions: Vec<ReferenceQuestion>) -> Result<Self, AppError> {
        validate_reference_set(&questions)?;
        let index = questions
            .iter()
            .enumerate()
            .map(|(position, question)| (question.id.clone(), position))
            .collect();
        Ok(Self { questions, index })
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let questions: Vec<ReferenceQuestion> = serde_json::from_str(raw)?;
        Self::new(questions)
    }

    pub fn built_in() -> Result<Self, AppError> {
        Self::from_json(BUILT_IN_QUESTIONS)
    }

    pub async fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }

    /// Loads the file at `path` when given, otherwise the questions shipped with the crate.
    pub async fn load(path: Option<&str>) -> Result<Self, AppError> {
        let set = match path.filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path)).await?,
            None => Self::built_in()?,
        };
        info!(
            questions = set.len(),
            source = path.unwrap_or("built-in"),
            "Loaded reference questions"
        );
        Ok(set)
    }

    pub fn questions(&self) -> &[ReferenceQuestion] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceQuestion> {
        self.index.get(id).and_then(|&i| self.questions.get(i))
    }

    /// Questions tagged with `role`, compared case-insensitively.
    pub fn by_role(&self, role: &str) -> Vec<&ReferenceQuestion> {
        let role = role.trim();
        self.questions
            .iter()
            .filter(|q| q.role.eq_ignore_ascii_case(role))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
