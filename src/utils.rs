// src/utils.rs

/// Format large numbers in a human-readable way
pub fn format_number(num: f64) -> String {
    if num >= 1_000_000_000.0 {
        format!("{:.2}B", num / 1_000_000_000.0)
    } else if num >= 1_000_000.0 {
        format!("{:.2}M", num / 1_000_000.0)
    } else if num >= 1_000.0 {
        format!("{:.2}K", num / 1_000.0)
    } else {
        format!("{:.0}", num)
    }
}

/// Keep at most `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Like [`truncate_chars`] but marks the cut with "...".
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", truncate_chars(text, limit))
    } else {
        text.to_string()
    }
}

/// Treat empty or whitespace-only strings coming from the API as missing.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
