//! Integration tests for the availability source client using wiremock

mod common;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tavolo::source::{AvailabilitySource, SourceError};

fn source_for(server: &MockServer) -> AvailabilitySource {
    let config = common::source_config(&format!("{}/api/availability", server.uri()));
    AvailabilitySource::new(config).unwrap()
}

/// The request carries the configured window with the upstream field names
#[tokio::test]
async fn test_request_payload_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .and(body_partial_json(json!({
            "DateFrom": "2025-10-20T00:00:00",
            "DateTo": "2025-12-12T00:00:00",
            "PartySize": 2,
            "ChannelCode": "ONLINE"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"AvailableDates": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let records = source.check().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_successful_extraction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AvailableDates": ["2025-11-01", {"Date": "2025-11-02", "Slots": [{"Time": "19:00"}]}]
        })))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let records = source.check().await.unwrap();
    assert_eq!(records.len(), 2);
}

/// Non-success statuses are SourceUnavailable, never a panic or silent empty
#[tokio::test]
async fn test_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let error = source.check().await.unwrap_err();

    assert!(matches!(error, SourceError::Status(503)));
    assert!(error.is_unavailable());
}

/// A 2xx with a non-JSON body is malformed, which is not "unavailable"
#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let error = source.check().await.unwrap_err();

    assert!(matches!(error, SourceError::Malformed(_)));
    assert!(!error.is_unavailable());
}

/// Unknown list field names fall back through the alias list
#[tokio::test]
async fn test_alias_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": ["2025-11-05"]
        })))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let records = source.check().await.unwrap();
    assert_eq!(records.len(), 1);
}

/// A bare array body is treated as the record list itself
#[tokio::test]
async fn test_body_as_list_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["2025-11-01"])))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let records = source.check().await.unwrap();
    assert_eq!(records.len(), 1);
}

/// A document without any recognized list is "no data", not an error
#[tokio::test]
async fn test_unrecognized_document_is_no_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Message": "Availability service is being updated"
        })))
        .mount(&mock_server)
        .await;

    let source = source_for(&mock_server);
    let records = source.check().await.unwrap();
    assert!(records.is_empty());
}
