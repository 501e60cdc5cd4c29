//! HTTP backend integration tests
//!
//! Drives `HttpBackend` against a `wiremock` server and checks request
//! shapes, response parsing and the error kind reported for each call.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{bodies_at, http_backend};
use medchat::backend::{Backend, PersistRequest, QueryRequest};
use medchat::MedchatError;

fn error_kind(err: &anyhow::Error) -> Option<&MedchatError> {
    err.downcast_ref::<MedchatError>()
}

#[tokio::test]
async fn test_create_session_posts_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/new"))
        .and(body_json(json!({ "user_id": "7" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "session_id": "sess_abc", "status": "success" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = http_backend(&server).create_session("7").await.unwrap();
    assert_eq!(id, "sess_abc");
}

#[tokio::test]
async fn test_create_session_without_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .mount(&server)
        .await;

    let err = http_backend(&server).create_session("7").await.unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(MedchatError::SessionCreation(_))
    ));
}

#[tokio::test]
async fn test_create_session_server_error_is_session_creation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/new"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "db down" })))
        .mount(&server)
        .await;

    let err = http_backend(&server).create_session("7").await.unwrap_err();
    assert!(matches!(
        error_kind(&err),
        Some(MedchatError::SessionCreation(_))
    ));
}

#[tokio::test]
async fn test_load_history_parses_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/sess_xyz/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "role": "user", "message": "Hi", "created_at": "Tue, 21 Oct 2025 10:00:00 GMT" },
            { "role": "assistant", "message": "Hello", "created_at": null }
        ])))
        .mount(&server)
        .await;

    let records = http_backend(&server).load_history("sess_xyz").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].role, "user");
    assert_eq!(records[0].message, "Hi");
    assert!(records[0].created_at.is_some());
    assert_eq!(records[1].created_at, None);
}

#[tokio::test]
async fn test_load_history_not_found_is_history_error() {
    let server = MockServer::start().await;

    let err = http_backend(&server).load_history("missing").await.unwrap_err();
    assert!(matches!(error_kind(&err), Some(MedchatError::HistoryLoad(_))));
}

#[tokio::test]
async fn test_persist_message_sends_all_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/save"))
        .and(body_json(json!({
            "user_id": "7",
            "session_id": "sess_abc",
            "role": "user",
            "message": "What is hypertension?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    http_backend(&server)
        .persist_message(&PersistRequest {
            user_id: "7".to_string(),
            session_id: "sess_abc".to_string(),
            role: "user".to_string(),
            message: "What is hypertension?".to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_persist_rejection_is_persistence_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/save"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "missing" })))
        .mount(&server)
        .await;

    let err = http_backend(&server)
        .persist_message(&PersistRequest {
            user_id: "7".to_string(),
            session_id: "sess_abc".to_string(),
            role: "assistant".to_string(),
            message: "x".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(error_kind(&err), Some(MedchatError::Persistence(_))));
}

#[tokio::test]
async fn test_query_parses_answer_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rag/query"))
        .and(body_json(json!({
            "query": "chest pain",
            "user_id": "7",
            "session_id": "sess_abc"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Seek care immediately.",
            "confidence": 0.82,
            "domains": ["cardiology", "emergency"],
            "is_emergency": true,
            "sources": []
        })))
        .mount(&server)
        .await;

    let response = http_backend(&server)
        .query(&QueryRequest {
            query: "chest pain".to_string(),
            user_id: "7".to_string(),
            session_id: "sess_abc".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.answer.as_deref(), Some("Seek care immediately."));
    assert_eq!(response.domains.len(), 2);
    assert!(response.is_emergency);
}

#[tokio::test]
async fn test_query_without_answer_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rag/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "confidence": 0.1 })))
        .mount(&server)
        .await;

    let response = http_backend(&server)
        .query(&QueryRequest {
            query: "q".to_string(),
            user_id: "7".to_string(),
            session_id: "s".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.answer, None);
}

#[tokio::test]
async fn test_query_server_error_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rag/query"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&server)
        .await;

    let err = http_backend(&server)
        .query(&QueryRequest {
            query: "q".to_string(),
            user_id: "7".to_string(),
            session_id: "s".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(error_kind(&err), Some(MedchatError::Query(_))));
}

#[tokio::test]
async fn test_delete_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/sessions/sess_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    http_backend(&server).delete_session("sess_abc").await.unwrap();
}

#[tokio::test]
async fn test_list_sessions_defaults_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "session_id": "sess_2",
                "title": "What is hypertension?",
                "created_at": "2025-10-21 10:00:00",
                "message_count": 4
            },
            { "session_id": "sess_1", "title": null, "message_count": 0 }
        ])))
        .mount(&server)
        .await;

    let sessions = http_backend(&server).list_sessions("7").await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].title, "What is hypertension?");
    assert_eq!(sessions[0].message_count, 4);
    assert_eq!(sessions[1].title, "New Chat");
    assert_eq!(sessions[1].created_at, None);
}

#[tokio::test]
async fn test_health_reports_unready_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "unhealthy",
            "pipeline_initialized": false,
            "domain_names": []
        })))
        .mount(&server)
        .await;

    let health = http_backend(&server).health().await.unwrap();
    assert_eq!(health.status, "unhealthy");
    assert!(!health.pipeline_initialized);
}

#[tokio::test]
async fn test_health_parses_domains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "pipeline_initialized": true,
            "domain_names": ["cardiology", "neurology"],
            "timestamp": "2025-10-21T10:00:00"
        })))
        .mount(&server)
        .await;

    let health = http_backend(&server).health().await.unwrap();
    assert!(health.pipeline_initialized);
    assert_eq!(health.domain_names, vec!["cardiology", "neurology"]);
    assert!(bodies_at(&server, "/api/health").await.len() == 1);
}
