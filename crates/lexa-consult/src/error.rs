use std::time::Duration;

use lexa_core::models::failure::FailureKind;
use thiserror::Error;

/// Longest server error excerpt shown to the user, in characters.
const EXCERPT_CHARS: usize = 200;

/// Fields a server error body may carry its explanation in.
const DETAIL_FIELDS: [&str; 3] = ["detail", "error", "message"];

#[derive(Debug, Clone, Error)]
pub enum ConsultError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),

    #[error("server returned HTTP {status}")]
    Server { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ConsultError {
    /// The user-facing failure, or `None` for a cancellation, which is
    /// dropped silently.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ConsultError::Timeout(after) => Some(FailureKind::Timeout {
                seconds: whole_seconds(*after),
            }),
            ConsultError::Network(_) => Some(FailureKind::NetworkFailure),
            ConsultError::Server { status, body } => Some(FailureKind::ServerError {
                status: *status,
                excerpt: excerpt(body),
            }),
            ConsultError::Malformed(_) => Some(FailureKind::MalformedResponse),
            ConsultError::Cancelled => None,
        }
    }
}

/// `after` rounded up to whole seconds, never zero.
fn whole_seconds(after: Duration) -> u64 {
    (after.as_secs_f64().ceil() as u64).max(1)
}

/// A short, readable slice of an error body.
///
/// JSON bodies contribute their `detail`/`error`/`message` string when they
/// have one.
fn excerpt(body: &str) -> Option<String> {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            DETAIL_FIELDS
                .iter()
                .find_map(|field| json.get(*field).and_then(|v| v.as_str()).map(str::to_string))
        });
    let text = detail.as_deref().unwrap_or(body).trim();
    if text.is_empty() {
        return None;
    }

    let mut cut: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        cut.push('…');
    }
    Some(cut)
}
