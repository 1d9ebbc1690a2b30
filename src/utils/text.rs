//! Text helpers for display-bound strings

/// Longest output line forwarded to a display surface
pub const MAX_LINE_LEN: usize = 100;

/// Cut `s` to at most `max` characters, never splitting a character
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Cut an output line to the display bound
pub fn display_line(s: &str) -> String {
    truncate(s, MAX_LINE_LEN)
}
