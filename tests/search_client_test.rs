//! Elasticsearch client tests against a mock HTTP server

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use imessage_search::search::MatchQuery;
use imessage_search::{ElasticsearchClient, IndexTarget, IndexedDocument, SearchBackend, SearchIndexError};

fn client(server: &MockServer) -> ElasticsearchClient {
    ElasticsearchClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn document(text: &str) -> IndexedDocument {
    IndexedDocument {
        text: Some(text.to_string()),
        timestamp: "2014-10-26 07:06:40".to_string(),
        sender: "+15551234567".to_string(),
        receiver: "self".to_string(),
    }
}

fn query(term: &str) -> MatchQuery {
    MatchQuery {
        index: "messages".to_string(),
        field: "text".to_string(),
        term: term.to_string(),
        size: None,
    }
}

#[tokio::test]
async fn test_bulk_sends_ndjson_and_reports_each_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "errors": false,
            "items": [
                { "index": { "_index": "messages", "status": 201 } },
                { "index": { "_index": "messages", "status": 201 } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = IndexTarget::new("messages").with_doc_type("message");
    let outcomes = client(&server)
        .bulk_index(&target, &[document("hello"), document("dinner at eight")])
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let lines: Vec<Value> = body.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], json!({ "index": { "_index": "messages", "_type": "message" } }));
    assert_eq!(lines[1]["text"], "hello");
    assert_eq!(lines[3]["sender"], "+15551234567");
    assert_eq!(lines[3]["receiver"], "self");
}

#[tokio::test]
async fn test_bulk_partial_failure_is_per_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                { "index": { "status": 201 } },
                { "index": { "status": 400, "error": { "type": "mapper_parsing_exception", "reason": "failed to parse field [timestamp]" } } },
                { "index": { "status": 201 } }
            ]
        })))
        .mount(&server)
        .await;

    let outcomes = client(&server)
        .bulk_index(&IndexTarget::new("messages"), &[document("a"), document("b"), document("c")])
        .await
        .unwrap();

    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert_eq!(outcomes[1].status, 400);
    assert_eq!(
        outcomes[1].error.as_deref(),
        Some("mapper_parsing_exception: failed to parse field [timestamp]")
    );
    assert!(outcomes[2].is_success());
}

#[tokio::test]
async fn test_bulk_request_rejected_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(503).set_body_string("cluster unavailable"))
        .mount(&server)
        .await;

    let result = client(&server).bulk_index(&IndexTarget::new("messages"), &[document("a")]).await;

    match result {
        Err(SearchIndexError::Backend { operation, status, body }) => {
            assert_eq!(operation, "bulk");
            assert_eq!(status, 503);
            assert_eq!(body, "cluster unavailable");
        },
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bulk_item_count_mismatch_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": false,
            "items": [{ "index": { "status": 201 } }]
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .bulk_index(&IndexTarget::new("messages"), &[document("a"), document("b")])
        .await;
    assert!(matches!(result, Err(SearchIndexError::Backend { operation: "bulk", .. })));
}

#[tokio::test]
async fn test_empty_bulk_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path("/_bulk")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let outcomes = client(&server).bulk_index(&IndexTarget::new("messages"), &[]).await.unwrap();
    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    let client = ElasticsearchClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let result = client.bulk_index(&IndexTarget::new("messages"), &[document("a")]).await;

    assert!(matches!(result, Err(SearchIndexError::Http(_))));
}

#[tokio::test]
async fn test_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/_refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_shards": { "total": 1, "successful": 1, "failed": 0 } })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).refresh("messages").await.unwrap();
}

#[tokio::test]
async fn test_refresh_of_missing_index_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/absent/_refresh"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": { "type": "index_not_found_exception" } })))
        .mount(&server)
        .await;

    let result = client(&server).refresh("absent").await;
    assert!(matches!(result, Err(SearchIndexError::Backend { operation: "refresh", status: 404, .. })));
}

#[tokio::test]
async fn test_match_query_with_object_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/_search"))
        .and(body_json(json!({ "query": { "match": { "text": "dinner" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 2,
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "max_score": 1.2,
                "hits": [
                    { "_index": "messages", "_score": 1.2, "_source": {
                        "text": "dinner at eight", "timestamp": "2014-10-26 07:06:40",
                        "sender": "self", "receiver": "+15551234567"
                    } },
                    { "_index": "messages", "_score": 0.7, "_source": {
                        "text": "dinner?", "timestamp": "2020-01-06 10:40:00",
                        "sender": "+15551234567", "receiver": "self"
                    } }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).match_query(&query("dinner")).await.unwrap();

    assert_eq!(response.total, 2);
    assert_eq!(response.hits.len(), 2);
    assert_eq!(response.hits[0].score, Some(1.2));
    assert_eq!(response.hits[0].document.text.as_deref(), Some("dinner at eight"));
    assert_eq!(response.hits[1].document.timestamp, "2020-01-06 10:40:00");
}

#[tokio::test]
async fn test_match_query_with_numeric_total_and_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/_search"))
        .and(body_json(json!({ "query": { "match": { "text": "lunch" } }, "size": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {
                "total": 5,
                "hits": [
                    { "_score": null, "_source": { "text": null, "timestamp": "2001-01-01 00:00:00", "sender": "group", "receiver": "self" } }
                ]
            }
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .match_query(&MatchQuery {
            size: Some(1),
            ..query("lunch")
        })
        .await
        .unwrap();

    assert_eq!(response.total, 5);
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].score, None);
    assert_eq!(response.hits[0].document.text, None);
    assert_eq!(response.hits[0].document.sender, "group");
}

#[tokio::test]
async fn test_match_query_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/_search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("parsing_exception"))
        .mount(&server)
        .await;

    let result = client(&server).match_query(&query("dinner")).await;
    assert!(matches!(result, Err(SearchIndexError::Backend { operation: "search", status: 400, .. })));
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages/_refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = ElasticsearchClient::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    client.refresh("messages").await.unwrap();
}
