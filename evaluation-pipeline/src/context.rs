use std::fmt::Write as _;

use common::{
    storage::types::session::{ContentKind, Session},
    utils::text_cleanup::truncate_chars,
};

/// Longest slice of a single session item that is placed in a prompt.
pub const MAX_ITEM_CHARS: usize = 6_000;

/// Renders the session's items as labelled prompt sections, in content-kind order.
///
/// Job descriptions with parsed posting sections get those lists appended so the model
/// sees them even when the raw text was truncated.
pub fn render_session_context(session: &Session, max_item_chars: usize) -> String {
    let mut out = String::new();

    for kind in ContentKind::ALL {
        let Some(item) = session.item(kind) else {
            continue;
        };

        let _ = writeln!(out, "## {}", kind.label());
        out.push_str(truncate_chars(item.text.trim(), max_item_chars));
        out.push('\n');

        if let Some(posting) = item.posting.as_ref().filter(|p| !p.is_empty()) {
            if !posting.responsibilities.is_empty() {
                out.push_str("\nKey responsibilities:\n");
                for line in &posting.responsibilities {
                    let _ = writeln!(out, "- {line}");
                }
            }
            if !posting.qualifications.is_empty() {
                out.push_str("\nKey qualifications:\n");
                for line in &posting.qualifications {
                    let _ = writeln!(out, "- {line}");
                }
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}
