//! Integration tests for the REST transport against a mock Results API.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use tekton_results::client::{ListRecordsRequest, ResultsClient};
use tekton_results::{HttpResultsClient, ResultsError, RunSelector, Service};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

const API_ROOT: &str = "/apis/results.tekton.dev/v1alpha2";

fn client(server: &MockServer, token: Option<&str>) -> HttpResultsClient {
    HttpResultsClient::new(&server.uri(), token.map(str::to_string), false).unwrap()
}

fn task_run(namespace: &str, name: &str, uid: &str) -> serde_json::Value {
    json!({
        "apiVersion": "tekton.dev/v1",
        "kind": "TaskRun",
        "metadata": {"name": name, "namespace": namespace, "uid": uid},
        "status": {
            "completionTime": "2025-12-29T11:05:00Z",
            "conditions": [{"type": "Succeeded", "status": "True", "reason": "Succeeded"}]
        }
    })
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_get_record_uses_parents_path_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/u1/records/u1")))
        .and(header("authorization", "Bearer s3cret"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "foo/results/u1/records/u1",
            "uid": "u1",
            "data": {"type": "tekton.dev/v1.TaskRun", "value": task_run("foo", "build", "u1")}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server, Some("s3cret"))
        .get_record("/foo/results/u1/records/u1")
        .await
        .unwrap();

    assert_eq!(record.name, "foo/results/u1/records/u1");
    assert_eq!(record.decode_run().unwrap().metadata.name, "build");
}

#[tokio::test]
async fn test_list_records_sends_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/-/records")))
        .and(query_param("filter", r#"data.metadata.name=="x""#))
        .and(query_param("order_by", "create_time desc"))
        .and(query_param("page_size", "5"))
        .and(query_param("page_token", "tok"))
        .and(query_param("fields", "records.name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"name": "foo/results/a/records/a", "uid": "a", "data": {"value": {}}}],
            "nextPageToken": "next"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, None)
        .list_records(&ListRecordsRequest {
            parent: "foo/results/-".to_string(),
            filter: r#"data.metadata.name=="x""#.to_string(),
            order_by: "create_time desc".to_string(),
            page_size: 5,
            page_token: "tok".to_string(),
            fields: "records.name".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.records.len(), 1);
    assert_eq!(response.next_page_token, "next");
}

#[tokio::test]
async fn test_http_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such record"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_record("foo/results/x/records/x")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_grpc_not_found_body_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"code": 5, "message": "record not found"})),
        )
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_record("foo/results/x/records/x")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_is_opaque() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string(" unavailable \n"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_record("foo/results/x/records/x")
        .await
        .unwrap_err();
    match err {
        ResultsError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .list_records(&ListRecordsRequest {
            parent: "-/results/-".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ResultsError::Serialization(_)));
}

#[tokio::test]
async fn test_empty_names_are_rejected_without_io() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, None);
    assert!(matches!(
        client.get_record("").await,
        Err(ResultsError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.get_log(" ").await,
        Err(ResultsError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.list_records(&ListRecordsRequest::default()).await,
        Err(ResultsError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_get_log_returns_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/a/logs/b")))
        .respond_with(ResponseTemplate::new(200).set_body_string("step one\nstep two\n"))
        .mount(&server)
        .await;

    let body = client(&server, None)
        .get_log("foo/results/a/logs/b")
        .await
        .unwrap();
    assert_eq!(body, b"step one\nstep two\n");
}

#[tokio::test]
async fn test_get_log_keeps_non_utf8_bytes() {
    let server = MockServer::start().await;
    let raw = vec![b'o', b'k', 0xff, 0xfe, b'\n'];
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/a/logs/bin")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(raw.clone()))
        .mount(&server)
        .await;

    let body = client(&server, None)
        .get_log("foo/results/a/logs/bin")
        .await
        .unwrap();
    assert_eq!(body, raw);
}

// =============================================================================
// Service over HTTP
// =============================================================================

#[tokio::test]
async fn test_base64_payloads_resolve_end_to_end() {
    let server = MockServer::start().await;
    let encoded = STANDARD.encode(task_run("foo", "build-1", "t1").to_string());

    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/-/records")))
        .and(query_param("page_size", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "name": "foo/results/pr/records/t1",
                "uid": "t1",
                "data": {"type": "tekton.dev/v1.TaskRun", "value": encoded}
            }],
            "nextPageToken": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = Service::new(Arc::new(client(&server, None)));
    let selector = RunSelector {
        namespace: "foo".to_string(),
        name: "build-1".to_string(),
        ..Default::default()
    };

    let detail = service
        .get_task_run(&selector, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(detail.summary.name, "build-1");
    assert_eq!(detail.summary.status, "True");
    assert_eq!(detail.raw["kind"], "TaskRun");
    assert!(detail.completed());
}

#[tokio::test]
async fn test_nested_task_run_fallback_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/t2/records/t2")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/parents/foo/results/-/records")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{
                "name": "foo/results/pr/records/t2",
                "uid": "t2",
                "data": {"value": task_run("foo", "nested", "t2")}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = Service::new(Arc::new(client(&server, None)));
    let selector = RunSelector {
        namespace: "foo".to_string(),
        uid: "t2".to_string(),
        ..Default::default()
    };

    let detail = service
        .get_task_run(&selector, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(detail.record_name, "foo/results/pr/records/t2");
}
