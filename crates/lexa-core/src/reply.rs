//! Shaping of loosely-typed collaborator replies into display text.
//!
//! Remote services disagree on where the answer lives and often send escaped
//! newlines as literal `\n` sequences. Everything here is a pure function of
//! the payload.

use std::sync::LazyLock;

use regex::Regex;

/// Candidate fields for the reply text, in priority order.
pub const REPLY_FIELDS: [&str; 6] = ["response", "answer", "result", "message", "text", "content"];

/// Shown when a reply carries no usable text at all.
pub const NO_RESPONSE_PLACEHOLDER: &str =
    "No answer was returned for this question. Please try rephrasing it.";

static ESCAPED_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\r\\n|\\n|\\r").expect("static regex"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("static regex"));

/// Pick the first non-empty candidate text out of a reply payload.
///
/// A bare JSON string is its own candidate.
pub fn select_reply(payload: &serde_json::Value) -> Option<&str> {
    match payload {
        serde_json::Value::String(s) => Some(s.as_str()).filter(|s| !s.trim().is_empty()),
        serde_json::Value::Object(map) => REPLY_FIELDS
            .iter()
            .filter_map(|field| map.get(*field))
            .filter_map(serde_json::Value::as_str)
            .find(|s| !s.trim().is_empty()),
        _ => None,
    }
}

/// Selected and normalized reply text, or [`NO_RESPONSE_PLACEHOLDER`].
pub fn reply_text(payload: &serde_json::Value) -> String {
    select_reply(payload)
        .map(normalize_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string())
}

/// Normalize line breaks in reply text.
///
/// Literal `\r\n`, `\n` and `\r` escape sequences become real line breaks,
/// CRLF and CR become LF, and any run of three or more line breaks (blank
/// lines holding only spaces or tabs count) collapses to exactly two. The
/// result is trimmed.
pub fn normalize_text(raw: &str) -> String {
    let unescaped = ESCAPED_BREAK.replace_all(raw, "\n");
    let unified = unescaped.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = BLANK_RUN.replace_all(&unified, "\n\n");
    collapsed.trim().to_string()
}
