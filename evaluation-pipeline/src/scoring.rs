use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use common::utils::config::AppConfig;

/// Weights used for linear blending of the semantic and keyword signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub semantic: f32,
    pub keyword: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            keyword: 0.3,
        }
    }
}

impl ScoreWeights {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            semantic: config.semantic_weight,
            keyword: config.keyword_weight,
        }
    }
}

/// Which reference keywords an answer mentions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordCoverage {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl KeywordCoverage {
    /// Fraction of keywords found, or `None` when the question has no keywords.
    pub fn ratio(&self) -> Option<f32> {
        let total = self.matched.len() + self.missing.len();
        if total == 0 {
            None
        } else {
            Some(self.matched.len() as f32 / total as f32)
        }
    }
}

/// Case-insensitive whole-word search for each keyword in `answer`.
pub fn keyword_overlap(keywords: &[String], answer: &str) -> KeywordCoverage {
    let mut coverage = KeywordCoverage::default();

    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            continue;
        }
        if contains_word(answer, keyword) {
            coverage.matched.push(keyword.to_string());
        } else {
            coverage.missing.push(keyword.to_string());
        }
    }

    coverage
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    // Explicit non-word guards instead of \b so keywords like "C++" still match.
    let pattern = format!(r"(?i)(?:^|[^\w]){}(?:$|[^\w])", regex::escape(needle));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(haystack),
        Err(err) => {
            warn!(keyword = needle, error = %err, "Keyword pattern rejected, using substring match");
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
    }
}

/// Blends semantic similarity with keyword coverage. Without keywords the semantic
/// score is used on its own.
pub fn blend(semantic: f32, keyword: Option<f32>, weights: ScoreWeights) -> f32 {
    let semantic = clamp_unit(semantic);
    let Some(keyword) = keyword else {
        return semantic;
    };

    let total = weights.semantic + weights.keyword;
    if !total.is_finite() || total <= 0.0 {
        return semantic;
    }

    clamp_unit((semantic * weights.semantic + clamp_unit(keyword) * weights.keyword) / total)
}

/// Maps a blended score in `[0, 1]` onto a 1..=10 band with cut points every 0.1.
pub fn score_band(blended: f32) -> u8 {
    let scaled = (clamp_unit(blended) * 10.0 + 1e-4).floor() as u8;
    (scaled + 1).min(10)
}

pub fn rating_label(band: u8) -> &'static str {
    match band {
        8..=u8::MAX => "excellent",
        6..=7 => "good",
        4..=5 => "fair",
        _ => "needs improvement",
    }
}

pub fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
