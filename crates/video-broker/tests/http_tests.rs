//! End-to-end tests of the HTTP surface against the in-memory platform.

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use room_registry_core::{ArchiveStatus, RegistryStore};
use room_registry_local::{FileStore, MemoryStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use video_broker::{create_router, AppState, BrokerSettings, MemoryPlatform};

const API_KEY: &str = "12345";

struct TestApp {
    router: Router,
    platform: Arc<MemoryPlatform>,
}

impl TestApp {
    fn new() -> Self {
        Self::with(Arc::new(MemoryStore::new()), BrokerSettings::default())
    }

    fn with(store: Arc<dyn RegistryStore>, settings: BrokerSettings) -> Self {
        let platform = Arc::new(MemoryPlatform::new(API_KEY));
        let state = AppState::new(store, platform.clone(), settings);
        Self {
            router: create_router(state),
            platform,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn start_archive(&self, session_id: &str) -> Value {
        let (status, body) = self
            .post_json("/archive/start", json!({ "sessionId": session_id }))
            .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }
}

fn file_store(dir: &Path) -> Arc<dyn RegistryStore> {
    Arc::new(FileStore::new(dir).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["storeBackend"], "memory");
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let app = TestApp::new();
    let (status, _, body) = app.get("/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("/room/"));
}

#[tokio::test]
async fn test_room_returns_credentials() {
    let app = TestApp::new();
    let (status, body) = app.get_json("/room/standup").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiKey"], API_KEY);
    assert!(body["sessionId"].as_str().unwrap().starts_with("1_MX4"));
    assert!(body["token"].as_str().unwrap().starts_with("T1=="));
}

#[tokio::test]
async fn test_room_is_stable_and_tokens_are_fresh() {
    let app = TestApp::new();
    let (_, first) = app.get_json("/room/standup").await;
    let (_, second) = app.get_json("/room/standup").await;

    assert_eq!(first["sessionId"], second["sessionId"]);
    assert_ne!(first["token"], second["token"]);
    assert_eq!(app.platform.sessions_created(), 1);
}

#[tokio::test]
async fn test_distinct_rooms_get_distinct_sessions() {
    let app = TestApp::new();
    let (_, a) = app.get_json("/room/a").await;
    let (_, b) = app.get_json("/room/b").await;

    assert_ne!(a["sessionId"], b["sessionId"]);
}

#[tokio::test]
async fn test_concurrent_first_requests_share_one_session() {
    let app = TestApp::new();
    app.platform
        .set_create_delay(std::time::Duration::from_millis(20));

    let requests = (0..8).map(|_| app.get_json("/room/race"));
    let results = futures::future::join_all(requests).await;

    let first = &results[0].1["sessionId"];
    for (status, body) in &results {
        assert_eq!(*status, StatusCode::OK);
        assert_eq!(&body["sessionId"], first);
    }
    assert_eq!(app.platform.sessions_created(), 1);
}

#[tokio::test]
async fn test_room_persists_across_restart() {
    let dir = TempDir::new().unwrap();

    let first = TestApp::with(file_store(dir.path()), BrokerSettings::default());
    let (_, before) = first.get_json("/room/weekly").await;

    let second = TestApp::with(file_store(dir.path()), BrokerSettings::default());
    let (_, after) = second.get_json("/room/weekly").await;

    assert_eq!(before["sessionId"], after["sessionId"]);
    assert_eq!(second.platform.sessions_created(), 0);

    let stored = std::fs::read_to_string(dir.path().join("weekly")).unwrap();
    assert_eq!(stored.trim_end(), before["sessionId"].as_str().unwrap());
}

#[tokio::test]
async fn test_room_upstream_failure_is_502_and_not_persisted() {
    let app = TestApp::new();
    app.platform.fail_next_create("provider down");

    let (status, body) = app.get_json("/room/flaky").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert_eq!(body["upstreamStatus"], 503);

    let (status, _) = app.get_json("/room/flaky").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.platform.sessions_created(), 1);
}

#[tokio::test]
async fn test_room_with_invalid_name_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app.get_json("/room/.hidden").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(app.platform.sessions_created(), 0);
}

#[tokio::test]
async fn test_session_redirects_to_default_room() {
    let app = TestApp::new();
    let (status, headers, _) = app.get("/session").await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/room/session");
}

#[tokio::test]
async fn test_join_unknown_room_is_404() {
    let app = TestApp::new();
    let (status, _, body) = app.get("/join/nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8(body).unwrap().contains("not found"));
    assert_eq!(app.platform.sessions_created(), 0);
}

#[tokio::test]
async fn test_join_existing_room_renders_credentials() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/standup").await;

    let (status, _, body) = app.get("/join/standup").await;
    let page = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(page.contains(room["sessionId"].as_str().unwrap()));
    assert!(page.contains(API_KEY));
    assert!(!page.contains("{{"));
}

#[tokio::test]
async fn test_archive_lifecycle() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/recorded").await;
    let session_id = room["sessionId"].as_str().unwrap();

    let started = app.start_archive(session_id).await;
    assert_eq!(started["status"], "started");
    assert_eq!(started["name"], "Getting Started Sample Archive");
    let archive_id = started["id"].as_str().unwrap().to_string();

    let (status, fetched) = app.get_json(&format!("/archive/{}", archive_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["sessionId"], session_id);

    let (status, body) = app
        .post_json(&format!("/archive/{}/stop", archive_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let stopped: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stopped["status"], "stopped");

    let (status, list) = app.get_json("/archive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], archive_id.as_str());
}

#[tokio::test]
async fn test_archive_start_uses_requested_name() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/named").await;

    let (status, body) = app
        .post_json(
            "/archive/start",
            json!({ "sessionId": room["sessionId"], "name": "Board meeting" }),
        )
        .await;
    let job: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["name"], "Board meeting");
}

#[tokio::test]
async fn test_archive_start_requires_session_id() {
    let app = TestApp::new();

    let (status, _) = app.post_json("/archive/start", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::post("/archive/start")
        .body(Body::from("sessionId="))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_archive_start_twice_is_upstream_conflict() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/twice").await;
    let session_id = room["sessionId"].as_str().unwrap();
    app.start_archive(session_id).await;

    let (status, body) = app
        .post_json("/archive/start", json!({ "sessionId": session_id }))
        .await;
    let error: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error["upstreamStatus"], 409);
}

#[tokio::test]
async fn test_unknown_archive_is_404() {
    let app = TestApp::new();

    let (status, body) = app.get_json("/archive/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .post_json("/archive/does-not-exist/stop", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_archives_empty_and_paging() {
    let app = TestApp::new();

    let (status, list) = app.get_json("/archive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
    assert_eq!(app.platform.last_list_request(), Some((0, 1000)));

    app.get_json("/archive?offset=5&count=10").await;
    assert_eq!(app.platform.last_list_request(), Some((5, 10)));

    app.get_json("/archive?offset=-3&count=abc").await;
    assert_eq!(app.platform.last_list_request(), Some((0, 1000)));
}

#[tokio::test]
async fn test_list_archives_respects_configured_cap() {
    let settings = BrokerSettings {
        archive_max_count: Some(50),
        ..BrokerSettings::default()
    };
    let app = TestApp::with(Arc::new(MemoryStore::new()), settings);

    app.get_json("/archive?count=500").await;
    assert_eq!(app.platform.last_list_request(), Some((0, 50)));
}

#[tokio::test]
async fn test_view_pending_then_redirect() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/viewing").await;
    let started = app.start_archive(room["sessionId"].as_str().unwrap()).await;
    let archive_id = started["id"].as_str().unwrap();
    let view = format!("/archive/{}/view", archive_id);

    let (status, _, body) = app.get(&view).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("started"));

    app.platform
        .set_archive_state(archive_id, ArchiveStatus::Available, None);
    let (status, _, _) = app.get(&view).await;
    assert_eq!(status, StatusCode::OK);

    app.platform.set_archive_state(
        archive_id,
        ArchiveStatus::Available,
        Some("https://cdn.example.com/archive.mp4"),
    );
    let (status, headers, _) = app.get(&view).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        headers[header::LOCATION],
        "https://cdn.example.com/archive.mp4"
    );

    let request = Request::post(view.as_str()).body(Body::empty()).unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn test_view_unknown_archive_is_404_page() {
    let app = TestApp::new();
    let (status, headers, body) = app.get("/archive/missing/view").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("<h1>Error</h1>"));
}

#[tokio::test]
async fn test_signal_reaches_session() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/chatty").await;
    let session_id = room["sessionId"].as_str().unwrap();

    let (status, _) = app
        .post_json("/signal", json!({ "sessionId": session_id }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let signals = app.platform.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].session_id, session_id);
    assert_eq!(signals[0].signal_type, "from-server");
    assert!(signals[0].data.starts_with("Signal from server at "));
}

#[tokio::test]
async fn test_signal_transport_failure_is_502() {
    let app = TestApp::new();
    let (_, room) = app.get_json("/room/offline").await;
    app.platform.fail_next_call_with_transport("connection refused");

    let (status, body) = app
        .post_json("/signal", json!({ "sessionId": room["sessionId"] }))
        .await;
    let error: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error.get("upstreamStatus").is_none());
}

#[tokio::test]
async fn test_events_are_appended_to_log() {
    let dir = TempDir::new().unwrap();
    let settings = BrokerSettings {
        events_log_dir: Some(dir.path().join("events")),
        ..BrokerSettings::default()
    };
    let app = TestApp::with(Arc::new(MemoryStore::new()), settings);

    for (kind, body) in [("archive", r#"{"status":"started"}"#), ("session", "x")] {
        let request = Request::post(format!("/events/{}", kind))
            .body(Body::from(body))
            .unwrap();
        let (status, _, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let log = std::fs::read_to_string(dir.path().join("events").join("events.txt")).unwrap();
    assert_eq!(log, "archive---{\"status\":\"started\"}\nsession---x\n");
}

#[tokio::test]
async fn test_events_without_log_dir_are_accepted() {
    let app = TestApp::new();
    let request = Request::post("/events/connection")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}
