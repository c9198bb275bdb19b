use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Why a consultation turn failed, as shown to the user.
///
/// Cancellation is absent: a superseded or reset turn is dropped
/// silently and never reaches the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum FailureKind {
    Validation { reason: String },
    Timeout { seconds: u64 },
    NetworkFailure,
    ServerError { status: u16, excerpt: Option<String> },
    MalformedResponse,
}

impl FailureKind {
    /// The sentence appended to the transcript in place of a reply.
    pub fn user_message(&self) -> String {
        match self {
            FailureKind::Validation { reason } => {
                format!("Your question could not be sent: {reason}.")
            }
            FailureKind::Timeout { seconds } => format!(
                "The consultation service did not answer within {seconds} {}. \
                 Please try again in a moment.",
                if *seconds == 1 { "second" } else { "seconds" }
            ),
            FailureKind::NetworkFailure => "Could not reach the consultation service. \
                 Please check your internet connection and try again."
                .to_string(),
            FailureKind::ServerError {
                status,
                excerpt: Some(excerpt),
            } => format!("The consultation service returned an error (HTTP {status}): {excerpt}"),
            FailureKind::ServerError {
                status,
                excerpt: None,
            } => format!(
                "The consultation service returned an error (HTTP {status}). \
                 Please try again later."
            ),
            FailureKind::MalformedResponse => {
                "The consultation service sent a reply that could not be read. \
                 Please try again."
                    .to_string()
            }
        }
    }
}
