//! The remote consultation service.

use async_trait::async_trait;
use lexa_core::reply::reply_text;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConsultError;

/// Body of a consultation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultRequest {
    pub query: String,
    pub user_id: String,
}

/// Anything that can answer a consultation query.
///
/// Implementations return the reply already normalized for display. Timeouts
/// and cancellation are applied by the caller, so an implementation only has
/// to report what the service itself did.
#[async_trait]
pub trait ConsultClient: Send + Sync + 'static {
    async fn consult(&self, request: &ConsultRequest) -> Result<String, ConsultError>;
}

/// JSON-over-HTTP consultation client.
pub struct HttpConsultClient {
    client: reqwest::Client,
    url: String,
}

impl HttpConsultClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConsultClient for HttpConsultClient {
    async fn consult(&self, request: &ConsultRequest) -> Result<String, ConsultError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ConsultError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConsultError::Network(e.to_string()))?;

        debug!(status = status.as_u16(), body_len = body.len(), "consultation response");

        if !status.is_success() {
            return Err(ConsultError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ConsultError::Malformed(e.to_string()))?;
        if !(payload.is_object() || payload.is_string()) {
            return Err(ConsultError::Malformed(format!(
                "expected a JSON object or string, got {}",
                json_kind(&payload)
            )));
        }

        Ok(reply_text(&payload))
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
