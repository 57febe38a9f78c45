use memory_mesh::{MeshClient, MeshConfig, MeshError, MemoryRecord, QueryMemoriesRequest};
use serde_json::{json, Map, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn record(v: Value) -> MemoryRecord {
    match v {
        Value::Object(o) => o,
        _ => panic!("record must be an object"),
    }
}

fn client_for(server: &MockServer) -> MeshClient {
    MeshClient::new(KEY, Some(server.uri())).unwrap()
}

#[tokio::test]
async fn add_memories_posts_records_and_returns_stored_ids() {
    let server = MockServer::start().await;
    let memories = vec![
        record(json!({"text": "met Ana at the cafe", "tags": ["people"]})),
        record(json!({"text": "ship v2 friday", "meta": {"priority": 1}})),
    ];

    Mock::given(method("POST"))
        .and(path("/api/v1/mesh/memories"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"memories": memories})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored_ids": ["m1", "m2"]})))
        .expect(1)
        .mount(&server)
        .await;

    let ids = client_for(&server).add_memories(&memories).await.unwrap();
    assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn add_memories_body_is_identity_of_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/mesh/memories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored_ids": ["x"]})))
        .mount(&server)
        .await;

    let memories = vec![record(json!({
        "text": "nested",
        "n": 1.5,
        "list": [1, "two", null, {"three": true}],
    }))];
    client_for(&server).add_memories(&memories).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: Value = received[0].body_json().unwrap();
    assert_eq!(body["memories"], json!(memories));
}

#[tokio::test]
async fn add_memories_empty_input_passes_server_ids_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/mesh/memories"))
        .and(body_json(json!({"memories": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored_ids": ["ghost"]})))
        .expect(1)
        .mount(&server)
        .await;

    // No count check against the input length.
    let ids = client_for(&server).add_memories(&[]).await.unwrap();
    assert_eq!(ids, vec!["ghost"]);
}

#[tokio::test]
async fn add_memories_missing_field_returns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .mount(&server)
        .await;

    let ids = client_for(&server).add_memories(&[]).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn query_without_filters_omits_filters_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/mesh/memories/query"))
        .and(header("authorization", "Bearer test-key"))
        .and(query_param("q", "foo"))
        .and(query_param("limit", "10"))
        .and(query_param_is_missing("filters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": []})))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client_for(&server).query("foo").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn query_with_filters_sends_json_encoded_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/mesh/memories/query"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut filters = Map::new();
    filters.insert("type".into(), json!("note"));
    let req = QueryMemoriesRequest::new("foo bar & baz")
        .with_limit(3)
        .with_filters(filters);
    client_for(&server).query_memories(&req).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let pairs: Vec<(String, String)> = received[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let q = pairs.iter().find(|(k, _)| k == "q").map(|(_, v)| v.as_str());
    assert_eq!(q, Some("foo bar & baz"));

    let raw = pairs
        .iter()
        .find(|(k, _)| k == "filters")
        .map(|(_, v)| v.clone())
        .expect("filters param present");
    let decoded: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, json!({"type": "note"}));
}

#[tokio::test]
async fn query_returns_hits_in_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/mesh/memories/query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"hits": [{"id": "a"}, {"id": "b"}]})),
        )
        .mount(&server)
        .await;

    let hits = client_for(&server).query("foo").await.unwrap();
    assert_eq!(hits, vec![record(json!({"id": "a"})), record(json!({"id": "b"}))]);
}

#[tokio::test]
async fn query_missing_field_returns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"took_ms": 4})))
        .mount(&server)
        .await;

    assert!(client_for(&server).query("foo").await.unwrap().is_empty());
}

#[tokio::test]
async fn not_found_is_http_error_for_both_calls() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(404).set_body_string("no such mesh"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    match client.add_memories(&[]).await {
        Err(MeshError::Http { status, body }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "no such mesh");
        }
        other => panic!("expected http error, got {other:?}"),
    }

    let err = client.query("foo").await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).add_memories(&[]).await.unwrap_err();
    assert!(matches!(err, MeshError::Http { .. }));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
}

#[tokio::test]
async fn malformed_body_is_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).query("foo").await.unwrap_err();
    assert!(matches!(err, MeshError::Json(_)));
}

#[tokio::test]
async fn trailing_slash_base_url_is_joined_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/mesh/memories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored_ids": ["m1"]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = MeshClient::new(KEY, Some(format!("{}/", server.uri()))).unwrap();
    assert_eq!(client.add_memories(&[]).await.unwrap(), vec!["m1"]);
}

#[tokio::test]
async fn timeout_surfaces_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"hits": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let cfg = MeshConfig::new(KEY)
        .with_base_url(server.uri())
        .with_timeout(Duration::from_millis(50));
    let err = MeshClient::from_config(cfg).unwrap().query("foo").await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let client = MeshClient::new(KEY, Some("http://127.0.0.1:1".to_string())).unwrap();
    let err = client.add_memories(&[]).await.unwrap_err();
    assert!(err.is_transport());
}
