//! Utils Module - Helper Functions & Shared Utilities

pub mod constants;
pub mod fit;

/// Reduce an activity title to something safe for a filename: keep
/// letters and underscores, join words with underscores, drop the rest.
/// Returns `None` when nothing printable survives (the caller falls back
/// to the label ID).
pub fn sanitize_title(title: &str) -> Option<String> {
    let cleaned = title
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphabetic() || *c == '_')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
