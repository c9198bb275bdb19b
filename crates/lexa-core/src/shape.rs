//! Shape tolerance for search and document payloads.
//!
//! Search responses are keyed by source, and each source may answer with a
//! bare list, a wrapped list, or an error marker. Sources are parsed one by
//! one so a broken source never takes the others down with it.

use serde::Deserialize;
use tracing::warn;

use crate::error::CoreError;
use crate::models::search::{SearchHit, SourceOutcome, SourceSection};
use crate::reply::normalize_text;

const DOC_SEGMENT: &str = "/doc/";

const DOCUMENT_FIELDS: [&str; 3] = ["text", "content", "body"];

/// Split a search response into one section per source, ordered by source
/// name.
///
/// Accepts either the source map itself or an object whose only key is
/// `results` wrapping that map.
pub fn parse_search_response(
    payload: &serde_json::Value,
) -> Result<Vec<SourceSection>, CoreError> {
    let map = payload
        .as_object()
        .ok_or_else(|| CoreError::UnexpectedShape("search response is not an object".into()))?;

    let map = match map.get("results").and_then(|r| r.as_object()) {
        Some(inner) if map.len() == 1 => inner,
        _ => map,
    };

    let mut sections: Vec<SourceSection> = map
        .iter()
        .map(|(source, value)| SourceSection {
            source: source.clone(),
            outcome: source_outcome(source, value),
        })
        .collect();
    sections.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(sections)
}

fn source_outcome(source: &str, value: &serde_json::Value) -> SourceOutcome {
    match value {
        serde_json::Value::Null => SourceOutcome::Empty,
        serde_json::Value::Array(items) => hits_outcome(source, items),
        serde_json::Value::Object(obj) => {
            if let Some(error) = obj.get("error").filter(|e| !e.is_null()) {
                return SourceOutcome::Error(error_text(error));
            }
            match obj.get("results") {
                Some(serde_json::Value::Array(items)) => hits_outcome(source, items),
                Some(serde_json::Value::Null) | None => SourceOutcome::Empty,
                Some(_) => SourceOutcome::Error("unexpected result format".to_string()),
            }
        }
        _ => SourceOutcome::Error("unexpected result format".to_string()),
    }
}

fn hits_outcome(source: &str, items: &[serde_json::Value]) -> SourceOutcome {
    let hits: Vec<SearchHit> = items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match SearchHit::deserialize(item) {
            Ok(hit) => Some(hit),
            Err(err) => {
                warn!(source, error = %err, "skipping unreadable search hit");
                None
            }
        })
        .map(|mut hit| {
            if hit.source.is_empty() {
                hit.source = source.to_string();
            }
            hit
        })
        .collect();

    if hits.is_empty() {
        SourceOutcome::Empty
    } else {
        SourceOutcome::Results(hits)
    }
}

fn error_text(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        serde_json::Value::Bool(true) => "source unavailable".to_string(),
        other => other.to_string(),
    }
}

/// Extract a document identifier from a result link.
///
/// `https://host/doc/123?src=x` gives `123`. Input without a `/doc/`
/// segment is taken to be the identifier itself.
pub fn document_id(link: &str) -> &str {
    let link = link.trim();
    if let Some(pos) = link.find(DOC_SEGMENT) {
        let rest = &link[pos + DOC_SEGMENT.len()..];
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        if end > 0 {
            return &rest[..end];
        }
    }
    link
}

/// Pull the document text out of whichever body shape the service used.
pub fn document_text(payload: &serde_json::Value) -> Option<String> {
    match payload {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(normalize_text(s)),
        serde_json::Value::Object(obj) => DOCUMENT_FIELDS
            .iter()
            .filter_map(|field| obj.get(*field))
            .filter_map(|v| v.as_str())
            .find(|s| !s.trim().is_empty())
            .map(normalize_text)
            .or_else(|| obj.get("document").and_then(document_text)),
        _ => None,
    }
}
