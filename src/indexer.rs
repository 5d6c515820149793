//! Bulk loading of messages into the search index.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::contacts::{ContactResolver, Participant};
use crate::document::assemble;
use crate::error::{Result, SearchIndexError};
use crate::metrics::MetricsCollector;
use crate::models::{IndexTarget, IndexedDocument, MessageRecord};
use crate::search::SearchBackend;
use crate::timestamp::TimeZoneSetting;

/// Documents per bulk request unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// A document the backend refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// Source row of the rejected message
    pub message_rowid: i64,
    /// Per-item status reported by the backend
    pub status: u16,
    /// Rejection reason
    pub reason: String,
}

/// Per-document outcome of an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Documents sent to the backend
    pub submitted: usize,
    /// Documents the backend stored
    pub succeeded: usize,
    /// Documents the backend rejected
    pub failures: Vec<BulkFailure>,
    /// Messages whose handle id was missing from the handle table
    pub unresolved_handles: usize,
}

impl BulkReport {
    /// Number of rejected documents
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every submitted document was stored
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.succeeded == self.submitted
    }
}

/// Where and how documents are written
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Destination index and legacy type
    pub target: IndexTarget,
    /// Timezone for rendered timestamps
    pub timezone: TimeZoneSetting,
    /// Documents per bulk request
    pub chunk_size: usize,
}

impl IndexOptions {
    /// Options for `target` with UTC timestamps and the default chunk size
    #[must_use]
    pub const fn new(target: IndexTarget) -> Self {
        Self {
            target,
            timezone: TimeZoneSetting::Utc,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Index every message, one bulk request per chunk.
///
/// Documents are built chunk by chunk. A transport or request-level failure
/// stops the run with an error; documents the backend rejects individually
/// are collected in the returned report.
pub async fn index_messages<B>(
    backend: &B, messages: &[MessageRecord], resolver: &ContactResolver, options: &IndexOptions,
) -> Result<BulkReport>
where
    B: SearchBackend + ?Sized,
{
    let metrics = MetricsCollector::default();
    let chunk_size = options.chunk_size.max(1);
    let mut report = BulkReport::default();

    for (chunk_number, chunk) in messages.chunks(chunk_size).enumerate() {
        let mut documents: Vec<IndexedDocument> = Vec::with_capacity(chunk.len());
        let mut unresolved = 0;
        for message in chunk {
            let (sender, receiver) = resolver.participants(message);
            if matches!(sender, Participant::Unresolved(_)) || matches!(receiver, Participant::Unresolved(_)) {
                unresolved += 1;
                debug!(rowid = message.rowid, handle_id = message.handle_id, "Handle not in handle table");
            }
            documents.push(assemble(message, &sender, &receiver, options.timezone)?);
        }
        report.unresolved_handles += unresolved;
        metrics.record_unresolved_handles(unresolved);

        let started = Instant::now();
        let outcomes = backend.bulk_index(&options.target, &documents).await?;
        if outcomes.len() != chunk.len() {
            return Err(SearchIndexError::Backend {
                operation: "bulk",
                status: 200,
                body: format!("expected {} item results, got {}", chunk.len(), outcomes.len()),
            });
        }

        let mut chunk_failed = 0;
        for (message, outcome) in chunk.iter().zip(outcomes) {
            if outcome.is_success() {
                report.succeeded += 1;
            } else {
                chunk_failed += 1;
                report.failures.push(BulkFailure {
                    message_rowid: message.rowid,
                    status: outcome.status,
                    reason: outcome.error.unwrap_or_else(|| format!("status {}", outcome.status)),
                });
            }
        }
        report.submitted += chunk.len();
        metrics.record_bulk_request(chunk.len() - chunk_failed, chunk_failed, started.elapsed());

        if chunk_failed > 0 {
            warn!(chunk = chunk_number + 1, failed = chunk_failed, "Backend rejected documents");
        }
        debug!(chunk = chunk_number + 1, documents = chunk.len(), "Chunk indexed");
    }

    info!(
        index = %options.target.index,
        submitted = report.submitted,
        succeeded = report.succeeded,
        failed = report.failed(),
        unresolved_handles = report.unresolved_handles,
        "Bulk indexing finished"
    );
    Ok(report)
}
