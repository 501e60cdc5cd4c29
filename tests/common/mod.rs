use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medchat::backend::HttpBackend;
use medchat::config::{BackendConfig, ChatConfig};
use medchat::session::{PointerStore, SqlitePointerStore, User};
use medchat::{ChatController, SpeechCapability};

#[allow(dead_code)]
pub fn test_user() -> User {
    User {
        id: "7".to_string(),
        name: "Dana".to_string(),
        email: "dana@example.com".to_string(),
    }
}

#[allow(dead_code)]
pub fn http_backend(server: &MockServer) -> Arc<HttpBackend> {
    let config = BackendConfig {
        base_url: server.uri(),
        ..BackendConfig::default()
    };
    Arc::new(HttpBackend::new(&config).expect("failed to build backend"))
}

#[allow(dead_code)]
pub fn create_temp_pointers() -> (Arc<SqlitePointerStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SqlitePointerStore::new_with_path(tmp.path().join("pointers.db"))
        .expect("failed to create pointer store");
    (Arc::new(store), tmp)
}

#[allow(dead_code)]
pub async fn start_controller(
    server: &MockServer,
    pointers: Arc<dyn PointerStore>,
) -> anyhow::Result<ChatController> {
    ChatController::start(
        test_user(),
        http_backend(server),
        pointers,
        SpeechCapability::Unavailable,
        ChatConfig::default(),
    )
    .await
}

/// Answer `POST /api/chat/new` with `session_id`
#[allow(dead_code)]
pub async fn mount_new_session(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat/new"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "session_id": session_id, "status": "success" })),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Accept every `POST /api/chat/save`
#[allow(dead_code)]
pub async fn mount_save(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/chat/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .mount(server)
        .await;
}

/// Answer every `POST /api/rag/query` with `answer`
#[allow(dead_code)]
pub async fn mount_answer(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/api/rag/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": answer,
            "confidence": 0.9,
            "domains": ["cardiology"],
            "is_emergency": false
        })))
        .mount(server)
        .await;
}

/// JSON bodies of requests received at `request_path`
#[allow(dead_code)]
pub async fn bodies_at(server: &MockServer, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

/// Wait (up to two seconds) for at least `count` requests at `request_path`
#[allow(dead_code)]
pub async fn wait_for_bodies(server: &MockServer, request_path: &str, count: usize) -> Vec<Value> {
    for _ in 0..200 {
        let bodies = bodies_at(server, request_path).await;
        if bodies.len() >= count {
            return bodies;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} requests at {}", count, request_path);
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
