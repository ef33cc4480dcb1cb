use std::sync::OnceLock;

use regex::Regex;

use common::{
    storage::types::session::PostingSections,
    utils::text_cleanup::dedupe_case_insensitive,
};

const MAX_HEADING_LEN: usize = 60;
const MAX_ITEMS_PER_SECTION: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Responsibilities,
    Qualifications,
    Other,
}

fn heading_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    #[allow(clippy::expect_used)]
    cell.get_or_init(|| Regex::new(pattern).expect("static regex pattern"))
}

/// Keyword search used for explicit headings (`# ...` or `...:`).
fn responsibilities_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(
        &RE,
        r"(?i)\b(responsibilities|duties|what you('|’)?ll (do|be doing)|what you will (do|be doing)|your role|the role|day[- ]to[- ]day|your impact|key tasks)\b",
    )
}

fn qualifications_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(
        &RE,
        r"(?i)\b(qualifications|requirements|what you('|’)?ll (need|bring)|what you will (need|bring)|what we('|’)?re looking for|who you are|skills|must[- ]haves?|nice[- ]to[- ]haves?|experience)\b",
    )
}

/// Whole-line patterns for bare headings, so content lines mentioning a keyword stay content.
fn responsibilities_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(
        &RE,
        r"(?i)^(?:(?:key|core|main|your|job|role)\s+)?(?:responsibilities|duties|tasks|what you('|’)?ll (?:do|be doing)|what you will (?:do|be doing)|the role|day[- ]to[- ]day|impact|in this role)$",
    )
}

fn qualifications_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(
        &RE,
        r"(?i)^(?:(?:minimum|basic|required|preferred|desired|key|your|job)\s+)?(?:qualifications|requirements|skills(?:\s+(?:and|&)\s+(?:experience|qualifications))?|experience|what you('|’)?ll (?:need|bring)|what you will (?:need|bring)|what we('|’)?re looking for|who you are|must[- ]haves?|nice[- ]to[- ]haves?)$",
    )
}

fn other_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(
        &RE,
        r"(?i)^(?:about(?:\s+(?:us|the\s+(?:company|team)))?|benefits|perks(?:\s+(?:and|&)\s+benefits)?|who we are|what we offer|compensation(?:\s+(?:and|&)\s+benefits)?|salary|why join us|how to apply|our (?:culture|values|mission))$",
    )
}

fn bullet_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    heading_regex(&RE, r"^(?:[-*+•·▪◦]|\d+[.)])\s*")
}

/// Locates "responsibilities" and "qualifications" lists in job posting text.
///
/// A heading is a short line that either starts with `#`, ends with `:`, or consists solely
/// of a known heading phrase such as "Qualifications" or "Benefits". Lines under a recognised
/// heading are collected as items until the next heading of any kind.
pub fn extract_posting_sections(text: &str) -> PostingSections {
    let mut responsibilities = Vec::new();
    let mut qualifications = Vec::new();
    let mut current: Option<Section> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(section) = classify_heading(line) {
            current = Some(section);
            continue;
        }

        let item = bullet_prefix().replace(line, "");
        let item = item.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
        if item.is_empty() {
            continue;
        }

        match current {
            Some(Section::Responsibilities) => responsibilities.push(item.to_string()),
            Some(Section::Qualifications) => qualifications.push(item.to_string()),
            Some(Section::Other) | None => {}
        }
    }

    PostingSections {
        responsibilities: cap(dedupe_case_insensitive(responsibilities)),
        qualifications: cap(dedupe_case_insensitive(qualifications)),
    }
}

fn cap(mut items: Vec<String>) -> Vec<String> {
    items.truncate(MAX_ITEMS_PER_SECTION);
    items
}

/// Returns the section a heading line opens, or `None` when the line is content.
fn classify_heading(line: &str) -> Option<Section> {
    if bullet_prefix().is_match(line) && !line.starts_with('#') {
        return None;
    }

    let explicit = line.starts_with('#') || line.ends_with(':');
    let stripped = line
        .trim_start_matches('#')
        .trim_end_matches(':')
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());

    if stripped.is_empty() || stripped.chars().count() > MAX_HEADING_LEN {
        return None;
    }

    if explicit {
        let section = if responsibilities_keyword().is_match(stripped) {
            Section::Responsibilities
        } else if qualifications_keyword().is_match(stripped) {
            Section::Qualifications
        } else {
            Section::Other
        };
        return Some(section);
    }

    if responsibilities_phrase().is_match(stripped) {
        Some(Section::Responsibilities)
    } else if qualifications_phrase().is_match(stripped) {
        Some(Section::Qualifications)
    } else if other_phrase().is_match(stripped) {
        Some(Section::Other)
    } else {
        None
    }
}
