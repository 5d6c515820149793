//! Search backend client.
//!
//! [`SearchBackend`] is the seam between the pipeline and the document index;
//! [`ElasticsearchClient`] implements it over the Elasticsearch HTTP API
//! (`_bulk`, `_refresh`, `_search`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::error::{Result, SearchIndexError};
use crate::models::{IndexTarget, IndexedDocument};

/// Outcome of one document in a bulk write, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
    /// Per-item HTTP status reported by the backend
    pub status: u16,
    /// Rejection reason, when the backend refused the document
    pub error: Option<String>,
}

impl BulkItemOutcome {
    /// True when the document was stored
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// A single-field match query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Index to search
    pub index: String,
    /// Document field to match against
    pub field: String,
    /// Search term
    pub term: String,
    /// Page size; the backend default applies when `None`
    pub size: Option<u64>,
}

impl MatchQuery {
    /// Request body for `_search`
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut field = Map::new();
        field.insert(self.field.clone(), Value::String(self.term.clone()));

        let mut body = json!({ "query": { "match": Value::Object(field) } });
        if let Some(size) = self.size {
            body["size"] = json!(size);
        }
        body
    }
}

/// One returned hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Relevance score, when the backend reports one
    pub score: Option<f64>,
    /// The stored document
    pub document: IndexedDocument,
}

/// First page of a query's results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Total number of matching documents
    pub total: u64,
    /// Returned hits, in backend ranking order
    pub hits: Vec<SearchHit>,
}

/// Document index operations used by the indexer and query interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Write `documents` to `target` in one batched call, returning one
    /// outcome per document in request order
    async fn bulk_index(&self, target: &IndexTarget, documents: &[IndexedDocument]) -> Result<Vec<BulkItemOutcome>>;

    /// Make recent writes to `index` visible to search
    async fn refresh(&self, index: &str) -> Result<()>;

    /// Run a single-field match query
    async fn match_query(&self, query: &MatchQuery) -> Result<SearchResponse>;
}

#[derive(Debug, Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, RawBulkItem>>,
}

#[derive(Debug, Deserialize)]
struct RawBulkItem {
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<RawHit>,
}

// Older backends report a bare number, newer ones `{ "value": n, "relation": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    const fn value(&self) -> u64 {
        match self {
            Self::Count(n) | Self::Object { value: n } => *n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: IndexedDocument,
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::Object(fields) => {
            let kind = fields.get("type").and_then(Value::as_str);
            let reason = fields.get("reason").and_then(Value::as_str);
            match (kind, reason) {
                (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
                (None, Some(reason)) => reason.to_string(),
                _ => error.to_string(),
            }
        },
        Value::String(reason) => reason.clone(),
        other => other.to_string(),
    }
}

/// Newline-delimited `_bulk` body: one action line and one source line per document
pub fn bulk_body(target: &IndexTarget, documents: &[IndexedDocument]) -> Result<String> {
    let mut action = Map::new();
    action.insert("_index".to_string(), Value::String(target.index.clone()));
    if let Some(doc_type) = &target.doc_type {
        action.insert("_type".to_string(), Value::String(doc_type.clone()));
    }
    let action_line = serde_json::to_string(&json!({ "index": Value::Object(action) }))?;

    let mut body = String::new();
    for document in documents {
        body.push_str(&action_line);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }
    Ok(body)
}

/// Elasticsearch HTTP client
pub struct ElasticsearchClient {
    base_url: String,
    client: Client,
}

impl ElasticsearchClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn check(response: Response, operation: &'static str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Search backend {} failed: {} - {}", operation, status, body);
        Err(SearchIndexError::Backend {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn bulk_index(&self, target: &IndexTarget, documents: &[IndexedDocument]) -> Result<Vec<BulkItemOutcome>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .build_request(Method::POST, "/_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(target, documents)?)
            .send()
            .await?;
        let response = Self::check(response, "bulk").await?;
        let parsed: RawBulkResponse = response.json().await?;

        if parsed.items.len() != documents.len() {
            return Err(SearchIndexError::Backend {
                operation: "bulk",
                status: 200,
                body: format!("expected {} item results, got {}", documents.len(), parsed.items.len()),
            });
        }

        let outcomes: Vec<BulkItemOutcome> = parsed
            .items
            .into_iter()
            .map(|item| {
                item.into_values().next().map_or(
                    BulkItemOutcome {
                        status: 0,
                        error: Some("empty bulk item result".to_string()),
                    },
                    |result| BulkItemOutcome {
                        status: result.status,
                        error: result.error.as_ref().map(error_reason),
                    },
                )
            })
            .collect();

        debug!(
            documents = documents.len(),
            errors = parsed.errors,
            "Bulk request completed"
        );
        Ok(outcomes)
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let response = self.build_request(Method::POST, &format!("/{index}/_refresh")).send().await?;
        Self::check(response, "refresh").await?;
        debug!(index, "Index refreshed");
        Ok(())
    }

    async fn match_query(&self, query: &MatchQuery) -> Result<SearchResponse> {
        let response = self
            .build_request(Method::POST, &format!("/{}/_search", query.index))
            .json(&query.to_body())
            .send()
            .await?;
        let response = Self::check(response, "search").await?;
        let parsed: RawSearchResponse = response.json().await?;

        let result = SearchResponse {
            total: parsed.hits.total.value(),
            hits: parsed
                .hits
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    score: hit.score,
                    document: hit.source,
                })
                .collect(),
        };
        debug!(total = result.total, returned = result.hits.len(), "Search completed");
        Ok(result)
    }
}
