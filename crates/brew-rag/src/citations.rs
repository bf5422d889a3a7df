//! Citation marker utilities for final answer text

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Opening tag used when highlighting a marker for display
pub const HIGHLIGHT_OPEN: &str = r#"<span class="citation-ref">"#;
pub const HIGHLIGHT_CLOSE: &str = "</span>";

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("valid citation pattern"));

// Matches an already highlighted marker first so it is passed through
// untouched, otherwise a bare marker.
static MARKER_OR_HIGHLIGHTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="citation-ref">\[\d+\]</span>|\[(\d+)\]"#)
        .expect("valid citation pattern")
});

/// Number of distinct citation numbers in `text`. `[1]` cited three times
/// counts once; `[01]` and `[1]` are the same citation.
pub fn count_citations(text: &str) -> usize {
    MARKER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| {
            let digits = m.as_str().trim_start_matches('0');
            if digits.is_empty() { "0" } else { digits }
        })
        .collect::<HashSet<_>>()
        .len()
}

/// Rewrite every bare `[n]` marker with `render(n)`. Markers already wrapped
/// in a highlight span are left as they are.
pub fn map_citations<F>(text: &str, render: F) -> String
where
    F: Fn(&str) -> String,
{
    MARKER_OR_HIGHLIGHTED
        .replace_all(text, |caps: &Captures| match caps.get(1) {
            Some(number) => render(number.as_str()),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Wrap each citation marker in a highlight span. Idempotent.
pub fn highlight_citations(text: &str) -> String {
    map_citations(text, |n| format!("{}[{}]{}", HIGHLIGHT_OPEN, n, HIGHLIGHT_CLOSE))
}
