//! End-of-message sentinel.
//!
//! Every line on the wire ends with the literal `&gt;`. It is not HTML
//! escaping, just a delimiter clients look for before parsing. Requests
//! may carry it directly after the JSON; responses always carry it
//! after a single space.

/// The literal end-of-message marker.
pub const SENTINEL: &str = "&gt;";

/// Remove surrounding whitespace (line endings included) and one
/// trailing sentinel, if present.
pub fn strip_sentinel(line: &str) -> &str {
    let line = line.trim_end();
    line.strip_suffix(SENTINEL).unwrap_or(line).trim()
}

/// `body` followed by a space and the sentinel.
pub fn append_sentinel(body: &str) -> String {
    let mut line = String::with_capacity(body.len() + 1 + SENTINEL.len());
    line.push_str(body);
    line.push(' ');
    line.push_str(SENTINEL);
    line
}
