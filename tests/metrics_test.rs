//! Tests for metrics collection

use std::time::Duration;

use imessage_search::metrics::MetricsCollector;

#[test]
fn test_metrics_collector_default() {
    let collector = MetricsCollector::default();

    assert_eq!(collector.documents_indexed_total, "imessage_search_documents_indexed_total");
    assert_eq!(collector.documents_failed_total, "imessage_search_documents_failed_total");
    assert_eq!(collector.unresolved_handles_total, "imessage_search_unresolved_handles_total");
    assert_eq!(collector.bulk_requests_total, "imessage_search_bulk_requests_total");
    assert_eq!(collector.queries_total, "imessage_search_queries_total");
    assert_eq!(collector.errors_total, "imessage_search_errors_total");
}

#[test]
fn test_metric_names_are_unique() {
    let collector = MetricsCollector::default();
    let mut names = vec![
        collector.documents_indexed_total,
        collector.documents_failed_total,
        collector.unresolved_handles_total,
        collector.bulk_requests_total,
        collector.bulk_request_duration,
        collector.queries_total,
        collector.query_hits,
        collector.query_duration,
        collector.errors_total,
    ];
    let count = names.len();
    names.sort_unstable();
    names.dedup();

    assert_eq!(names.len(), count);
    assert!(names.iter().all(|name| name.starts_with("imessage_search_")));
}

#[test]
fn test_record_bulk_request() {
    let collector = MetricsCollector::default();
    collector.record_bulk_request(500, 0, Duration::from_millis(120));
    collector.record_bulk_request(498, 2, Duration::from_millis(95));
}

#[test]
fn test_record_zero_unresolved_handles() {
    let collector = MetricsCollector::default();
    collector.record_unresolved_handles(0);
}

#[test]
fn test_record_query_and_errors() {
    let collector = MetricsCollector::default();
    collector.record_query(0, Duration::ZERO);
    collector.record_query(u64::MAX, Duration::from_secs(1));

    for stage in ["load", "resolve", "index", "query"] {
        collector.record_error(stage);
    }
}
