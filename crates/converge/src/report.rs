//! Before/after rendering

use serde_json::Value;
use similar::{ChangeTag, TextDiff};

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

/// Unified diff of two documents rendered as pretty JSON
///
/// Empty when the documents are equal.
pub fn unified_diff(before: &Value, after: &Value) -> String {
    if before == after {
        return String::new();
    }
    let before = pretty(before);
    let after = pretty(after);
    TextDiff::from_lines(&before, &after)
        .unified_diff()
        .context_radius(3)
        .header("before", "after")
        .to_string()
}

/// Number of inserted and deleted lines between two documents
pub fn line_changes(before: &Value, after: &Value) -> (usize, usize) {
    let before = pretty(before);
    let after = pretty(after);
    let diff = TextDiff::from_lines(&before, &after);
    diff.iter_all_changes()
        .fold((0, 0), |(ins, del), change| match change.tag() {
            ChangeTag::Insert => (ins + 1, del),
            ChangeTag::Delete => (ins, del + 1),
            ChangeTag::Equal => (ins, del),
        })
}
