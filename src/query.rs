//! Single-field match queries against the populated index.

use std::fmt::Write as _;
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::search::{MatchQuery, SearchBackend, SearchResponse};
use crate::validation::InputValidator;

/// Field matched when none is given
pub const DEFAULT_QUERY_FIELD: &str = "text";

/// Run a match query for `term` on `field` of `index`.
///
/// Only the first page is fetched; `size` overrides the backend's page size.
pub async fn search_messages<B>(backend: &B, index: &str, field: &str, term: &str, size: Option<u64>) -> Result<SearchResponse>
where
    B: SearchBackend + ?Sized,
{
    InputValidator::validate_index_name(index)?;
    InputValidator::validate_field_name(field)?;
    InputValidator::validate_search_term(term)?;
    if let Some(size) = size {
        InputValidator::validate_page_size(size)?;
    }

    let query = MatchQuery {
        index: index.to_string(),
        field: field.to_string(),
        term: term.to_string(),
        size,
    };

    let started = Instant::now();
    let response = backend.match_query(&query).await?;
    MetricsCollector::default().record_query(response.total, started.elapsed());

    info!(index, field, total = response.total, returned = response.hits.len(), "Query finished");
    Ok(response)
}

/// Render the total hit count, then one `timestamp  text` line per hit
#[must_use]
pub fn format_results(response: &SearchResponse) -> String {
    let mut out = format!("Total hits: {}\n", response.total);
    for hit in &response.hits {
        let _ = writeln!(out, "{}  {}", hit.document.timestamp, hit.document.text.as_deref().unwrap_or(""));
    }
    out
}
