use tracing::{info, warn};

use crate::contacts::ContactResolver;
use crate::error::Result;
use crate::indexer::{index_messages, BulkReport, IndexOptions};
use crate::logging::StageTimer;
use crate::metrics::MetricsCollector;
use crate::query;
use crate::schema::{handle, message};
use crate::search::{SearchBackend, SearchResponse};
use crate::source::ChatDatabase;

/// Runs the load → resolve → index pipeline and queries against one backend
pub struct IndexService<B: SearchBackend> {
    backend: B,
    options: IndexOptions,
    refresh_after_index: bool,
    metrics: MetricsCollector,
}

impl<B: SearchBackend> IndexService<B> {
    /// Create a service writing to `options.target` through `backend`
    pub fn new(backend: B, options: IndexOptions) -> Self {
        Self {
            backend,
            options,
            refresh_after_index: true,
            metrics: MetricsCollector::default(),
        }
    }

    /// Whether to refresh the index after a run (default true)
    #[must_use]
    pub const fn refresh_after_index(mut self, refresh: bool) -> Self {
        self.refresh_after_index = refresh;
        self
    }

    /// Backend the service writes to and queries
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Indexing options in use
    pub const fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Load both tables from `database`, resolve contacts and index every message
    pub async fn index_database(&self, database: &ChatDatabase) -> Result<BulkReport> {
        let timer = StageTimer::start("load_source");
        let handles = database.load_handles().inspect_err(|_| self.metrics.record_error("load"))?;
        let messages = database.load_messages().inspect_err(|_| self.metrics.record_error("load"))?;
        timer.finish();
        info!(messages = messages.len(), handles = handles.len(), "Loaded source tables");

        let resolver = ContactResolver::from_handles(&handles).inspect_err(|_| self.metrics.record_error("resolve"))?;

        let timer = StageTimer::start("bulk_index");
        let report = index_messages(&self.backend, &messages, &resolver, &self.options)
            .await
            .inspect_err(|_| self.metrics.record_error("index"))?;
        timer.finish();

        // Stored documents stay stored; a failed refresh only delays their visibility.
        if self.refresh_after_index && report.succeeded > 0 {
            if let Err(err) = self.backend.refresh(&self.options.target.index).await {
                self.metrics.record_error("refresh");
                warn!(index = %self.options.target.index, error = %err, "Index refresh failed");
            }
        }

        Ok(report)
    }

    /// Match `term` against `field` of the configured index
    pub async fn search(&self, field: &str, term: &str, size: Option<u64>) -> Result<SearchResponse> {
        query::search_messages(&self.backend, &self.options.target.index, field, term, size)
            .await
            .inspect_err(|_| self.metrics.record_error("query"))
    }
}

/// Discovered columns of the message and handle tables
pub fn source_schema(database: &ChatDatabase) -> Result<Vec<(&'static str, Vec<String>)>> {
    Ok(vec![
        (message::TABLE, database.table_columns(message::TABLE)?),
        (handle::TABLE, database.table_columns(handle::TABLE)?),
    ])
}
