//! Text helpers shared by the scraper and the exporter

/// Collapse every run of whitespace into a single space and trim both ends
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max_chars` characters, never splitting a code point
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Make a user string safe to embed in a file name
///
/// Spaces become underscores, as do the characters Windows rejects in paths.
pub fn sanitize_filename_component(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            ' ' | '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}
