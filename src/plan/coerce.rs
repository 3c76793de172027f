//! Value coercion for filter operators.
//!
//! Filter values always arrive as strings. Lists use commas as separators and
//! `\,` for a literal comma: `a\,b,c` is the two items `a,b` and `c`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Split a list value on unescaped commas.
///
/// Returns `None` unless there are at least two items and none is empty.
pub fn split_list(raw: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                current.push(',');
                chars.next();
            }
            ',' => items.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    items.push(current);

    if items.len() < 2 || items.iter().any(String::is_empty) {
        return None;
    }
    Some(items)
}

/// Split a `between` value into its two bounds.
pub fn split_range(raw: &str) -> Option<(String, String)> {
    let mut items = split_list(raw)?;
    if items.len() != 2 {
        return None;
    }
    let high = items.pop()?;
    let low = items.pop()?;
    Some((low, high))
}

/// Parse a calendar date: `YYYY-MM-DD`, an RFC 3339 timestamp, or
/// `YYYY-MM-DD HH:MM:SS`. Timestamps keep only their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Escape character used in every generated LIKE.
pub const LIKE_ESCAPE: char = '\\';

/// Substring pattern for `like`/`notLike`: wildcards in the value match
/// literally.
pub fn like_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
