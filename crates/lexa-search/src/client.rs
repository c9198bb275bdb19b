use lexa_core::error::CoreError;
use lexa_core::markup::to_markup;
use lexa_core::models::search::{Analysis, Document, SearchFilters, SourceOutcome, SourceSection};
use lexa_core::reply::reply_text;
use lexa_core::shape::{document_id, document_text, parse_search_response};
use lexa_core::validation::QueryLimits;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SearchError;

/// Where each collaborator service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoints {
    pub search_url: String,
    pub analysis_url: String,
    pub document_url: String,
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    filters: &'a SearchFilters,
}

/// HTTP client for search, analysis, and document retrieval.
///
/// Holds no session state; every call is independent.
pub struct SearchClient {
    client: reqwest::Client,
    endpoints: SearchEndpoints,
    limits: QueryLimits,
}

impl SearchClient {
    pub fn new(endpoints: SearchEndpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints, QueryLimits::default())
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoints: SearchEndpoints,
        limits: QueryLimits,
    ) -> Self {
        Self {
            client,
            endpoints,
            limits,
        }
    }

    pub fn endpoints(&self) -> &SearchEndpoints {
        &self.endpoints
    }

    /// Run a search and split the response into per-source sections.
    ///
    /// A source that reports an error yields an error section; it never
    /// fails the whole call.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<SourceSection>, SearchError> {
        let query = self.limits.validate(query)?;
        let payload = self
            .post_json(&self.endpoints.search_url, &QueryBody { query, filters })
            .await?;
        let sections = parse_search_response(&payload)?;

        for section in &sections {
            if let SourceOutcome::Error(reason) = &section.outcome {
                warn!(source = %section.source, reason = %reason, "search source failed");
            }
        }
        info!(sources = sections.len(), "search completed");
        Ok(sections)
    }

    /// Ask the analysis service about `query`.
    pub async fn analyze(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Analysis, SearchError> {
        let query = self.limits.validate(query)?;
        let payload = self
            .post_json(&self.endpoints.analysis_url, &QueryBody { query, filters })
            .await?;

        let text = reply_text(&payload);
        let markup = to_markup(&text);
        info!(text_len = text.len(), "analysis completed");
        Ok(Analysis { text, markup })
    }

    /// Fetch a document by result link or bare identifier.
    pub async fn fetch_document(&self, link_or_id: &str) -> Result<Document, SearchError> {
        let id = document_id(link_or_id);
        if id.is_empty() {
            return Err(SearchError::EmptyDocumentId);
        }
        let url = format!("{}/{}", self.endpoints.document_url.trim_end_matches('/'), id);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%url, status = status.as_u16(), body_len = body.len(), "document response");

        if !status.is_success() {
            return Err(SearchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(payload) => document_text(&payload)
                .ok_or_else(|| CoreError::MissingField("document text".into()))?,
            Err(_) => body,
        };

        Ok(Document {
            id: id.to_string(),
            text,
        })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<serde_json::Value, SearchError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%url, status = status.as_u16(), body_len = text.len(), "collaborator response");

        if !status.is_success() {
            return Err(SearchError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| SearchError::Malformed(e.to_string()))
    }
}
