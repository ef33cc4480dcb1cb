use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // Patterns are compile-time constants covered by the tests below.
    #[allow(clippy::expect_used)]
    cell.get_or_init(|| Regex::new(pattern).expect("static regex pattern"))
}

/// Collapses runs of horizontal whitespace and keeps at most one blank line between paragraphs.
pub fn collapse_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let normalized = text.replace("\r\n", "\n").replace('\u{a0}', " ");
    let spaced = regex(&SPACES, r"[ \t\f\v]+").replace_all(&normalized, " ");
    let trimmed_lines: Vec<&str> = spaced.lines().map(str::trim).collect();
    let joined = trimmed_lines.join("\n");
    regex(&BLANK_LINES, r"\n{3,}")
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Removes markdown syntax so the text reads naturally when spoken.
pub fn strip_markdown(text: &str) -> String {
    static CODE_FENCE: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();
    static HEADING: OnceLock<Regex> = OnceLock::new();
    static BULLET: OnceLock<Regex> = OnceLock::new();
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();

    let text = regex(&CODE_FENCE, r"```[a-zA-Z0-9_-]*").replace_all(text, "");
    let text = regex(&LINK, r"\[([^\]]+)\]\([^)]*\)").replace_all(&text, "$1");
    let text = regex(&HEADING, r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").replace_all(&text, "");
    let text = regex(&BULLET, r"(?m)^[ \t]*(?:[-*+]|\d+[.)])[ \t]+").replace_all(&text, "");
    let text = regex(&EMPHASIS, r"[*_`~]+").replace_all(&text, "");

    collapse_whitespace(&text)
}

/// Returns at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text.get(..idx).unwrap_or(text),
        None => text,
    }
}

/// Returns the longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    text.get(..end).unwrap_or_default()
}

/// Trims entries, drops empty ones and removes case-insensitive duplicates, keeping first occurrence.
pub fn dedupe_case_insensitive<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| collapse_whitespace(&item))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_whitespace_normalizes_runs_and_blank_lines() {
        let input = "  Senior\t\tEngineer \r\n\r\n\r\n\r\nRust   and Go\u{a0}\u{a0}stack  ";
        assert_eq!(collapse_whitespace(input), "Senior Engineer\n\nRust and Go stack");
    }

    #[test]
    fn strip_markdown_keeps_readable_text() {
        let input = "## Feedback\n\n- **Strong** answer with `code`\n1. See [docs](https://x.y)\n```rust\nlet a = 1;\n```";
        let out = strip_markdown(input);
        assert_eq!(
            out,
            "Feedback\n\nStrong answer with code\nSee docs\n\nlet a = 1;"
        );
    }

    #[test]
    fn truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn truncate_bytes_never_splits_a_char() {
        assert_eq!(truncate_bytes("aé", 2), "a");
        assert_eq!(truncate_bytes("aé", 3), "aé");
        assert_eq!(truncate_bytes("", 5), "");
    }

    #[test]
    fn dedupe_is_case_insensitive_and_ordered() {
        let items = vec![
            "Tell me about yourself".to_string(),
            "  tell me   about yourself ".to_string(),
            String::new(),
            "Why Rust?".to_string(),
        ];
        assert_eq!(
            dedupe_case_insensitive(items),
            vec!["Tell me about yourself".to_string(), "Why Rust?".to_string()]
        );
    }
}
