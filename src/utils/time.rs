//! Timestamp parsing and duration formatting
//!
//! Timestamps are typed by the user as `h:mm:ss`, `mm:ss` or `ss`.

/// Parse a timestamp into seconds.
///
/// The rightmost component is seconds, then minutes, then hours. Anything that
/// is not a plain number (or has more than three parts) yields `None`, which
/// callers treat the same as "no time given".
pub fn parse_timestamp(input: &str) -> Option<u64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut total = 0u64;
    let mut unit = 1u64;
    for part in parts.iter().rev() {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u64 = part.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        unit *= 60;
    }

    Some(total)
}

/// Parse an optional timestamp, folding parse failures into `None`
pub fn parse_optional(input: Option<&str>) -> Option<u64> {
    input.and_then(parse_timestamp)
}

/// Format seconds as `h:mm:ss`, or `mm:ss` under an hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
