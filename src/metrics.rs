use std::time::Duration;

use ::metrics::{counter, histogram};

/// Metric names recorded by the indexer and query paths.
///
/// Recording is a no-op until a global recorder is installed.
pub struct MetricsCollector {
    /// Documents accepted by the backend
    pub documents_indexed_total: &'static str,
    /// Documents rejected by the backend
    pub documents_failed_total: &'static str,
    /// Messages whose handle was missing from the handle table
    pub unresolved_handles_total: &'static str,
    /// Bulk requests sent
    pub bulk_requests_total: &'static str,
    /// Bulk request latency
    pub bulk_request_duration: &'static str,
    /// Queries issued
    pub queries_total: &'static str,
    /// Total hits reported per query
    pub query_hits: &'static str,
    /// Query latency
    pub query_duration: &'static str,
    /// Fatal errors by pipeline stage
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            documents_indexed_total: "imessage_search_documents_indexed_total",
            documents_failed_total: "imessage_search_documents_failed_total",
            unresolved_handles_total: "imessage_search_unresolved_handles_total",
            bulk_requests_total: "imessage_search_bulk_requests_total",
            bulk_request_duration: "imessage_search_bulk_request_duration_seconds",
            queries_total: "imessage_search_queries_total",
            query_hits: "imessage_search_query_hits",
            query_duration: "imessage_search_query_duration_seconds",
            errors_total: "imessage_search_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record one bulk request and its per-document outcome
    pub fn record_bulk_request(&self, succeeded: usize, failed: usize, duration: Duration) {
        counter!(self.bulk_requests_total).increment(1);
        counter!(self.documents_indexed_total).increment(succeeded as u64);
        counter!(self.documents_failed_total).increment(failed as u64);
        histogram!(self.bulk_request_duration).record(duration.as_secs_f64());
    }

    /// Record messages that referenced an unknown handle
    pub fn record_unresolved_handles(&self, count: usize) {
        counter!(self.unresolved_handles_total).increment(count as u64);
    }

    /// Record one match query
    pub fn record_query(&self, total_hits: u64, duration: Duration) {
        counter!(self.queries_total).increment(1);
        #[allow(clippy::cast_precision_loss)]
        histogram!(self.query_hits).record(total_hits as f64);
        histogram!(self.query_duration).record(duration.as_secs_f64());
    }

    /// Record a fatal error in `stage`
    pub fn record_error(&self, stage: &'static str) {
        counter!(self.errors_total, "stage" => stage).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_names() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.documents_indexed_total, "imessage_search_documents_indexed_total");
        assert!(collector.bulk_request_duration.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_bulk_request(10, 2, Duration::from_millis(15));
        collector.record_unresolved_handles(1);
        collector.record_query(4, Duration::from_millis(3));
        collector.record_error("load");
    }
}
