use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What an uploaded piece of content describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Resume,
    JobDescription,
    CompanyInfo,
    OtherInfo,
}

impl ContentKind {
    pub const ALL: [Self; 4] = [
        Self::Resume,
        Self::JobDescription,
        Self::CompanyInfo,
        Self::OtherInfo,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::JobDescription => "job_description",
            Self::CompanyInfo => "company_info",
            Self::OtherInfo => "other_info",
        }
    }

    /// Heading used when the item is rendered into an LLM prompt.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Resume => "Candidate resume",
            Self::JobDescription => "Job description",
            Self::CompanyInfo => "Company information",
            Self::OtherInfo => "Additional information",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "resume" | "cv" => Ok(Self::Resume),
            "job_description" | "job" | "jd" => Ok(Self::JobDescription),
            "company_info" | "company" => Ok(Self::CompanyInfo),
            "other_info" | "other" => Ok(Self::OtherInfo),
            other => Err(AppError::Validation(format!(
                "Unknown content kind '{other}'"
            ))),
        }
    }
}

/// How the content reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionMethod {
    File,
    Text,
    Url,
}

impl FromStr for IngestionMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "text" => Ok(Self::Text),
            "url" | "link" => Ok(Self::Url),
            other => Err(AppError::Validation(format!(
                "Unknown ingestion method '{other}'"
            ))),
        }
    }
}

/// Sections located in a job posting by heading heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingSections {
    pub responsibilities: Vec<String>,
    pub qualifications: Vec<String>,
}

impl PostingSections {
    pub fn is_empty(&self) -> bool {
        self.responsibilities.is_empty() && self.qualifications.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub kind: ContentKind,
    pub method: IngestionMethod,
    pub text: String,
    /// File name, URL, or search query the text came from.
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posting: Option<PostingSections>,
    pub created_at: DateTime<Utc>,
}

impl SessionItem {
    pub fn new(kind: ContentKind, method: IngestionMethod, text: String) -> Self {
        Self {
            kind,
            method,
            text,
            source: None,
            posting: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_posting(mut self, posting: PostingSections) -> Self {
        self.posting = Some(posting);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub items: HashMap<ContentKind, SessionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionItemSummary {
    pub kind: ContentKind,
    pub method: IngestionMethod,
    pub source: Option<String>,
    pub characters: usize,
    pub has_posting_sections: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub items: Vec<SessionItemSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            items: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item(&self, kind: ContentKind) -> Option<&SessionItem> {
        self.items.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Summary without the raw text, ordered by content kind.
    pub fn summary(&self) -> SessionSummary {
        let items = ContentKind::ALL
            .iter()
            .filter_map(|kind| self.items.get(kind))
            .map(|item| SessionItemSummary {
                kind: item.kind,
                method: item.method,
                source: item.source.clone(),
                characters: item.text.chars().count(),
                has_posting_sections: item.posting.as_ref().is_some_and(|p| !p.is_empty()),
            })
            .collect();

        SessionSummary {
            session_id: self.id.clone(),
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
