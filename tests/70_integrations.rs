mod common;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use common::{test_app, test_app_with};
use oasis_api::config::AppConfig;
use oasis_api::database::memory::demo;
use oasis_api::error::CHAT_FAILURE;

#[tokio::test]
async fn chat_streams_reply_as_sse() {
    let app = test_app();
    let res = app
        .call(
            "POST",
            "/api/chat",
            demo::PARTICIPANTE,
            Some(json!({ "mode": "coach", "messages": [{ "role": "user", "content": "Hola" }] })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    let content_type = res.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert!(res.text.contains("event: message"));
    assert!(res.text.contains("data: [coach] "));
    assert!(res.text.contains("data: Hola"));
}

#[tokio::test]
async fn chat_defaults_to_mentor() {
    let app = test_app();
    let res = app
        .call(
            "POST",
            "/api/chat",
            demo::PARTICIPANTE,
            Some(json!({ "mode": "otro", "messages": [{ "role": "user", "content": "?" }] })),
        )
        .await;
    assert!(res.text.contains("[mentor]"));
}

#[tokio::test]
async fn chat_errors() {
    let app = test_app();

    let res = app
        .call("POST", "/api/chat", demo::PARTICIPANTE, Some(json!({ "messages": [] })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .call(
            "POST",
            "/api/chat",
            demo::PARTICIPANTE,
            Some(json!({ "messages": [{ "role": "user", "content": "fallar" }] })),
        )
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json()["error"], CHAT_FAILURE);
}

#[tokio::test]
async fn superset_requires_dashboard_id() {
    let app = test_app();

    let res = app.get("/api/superset/token", demo::ADMIN).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // No domain configured
    let res = app.get("/api/superset/token?id=abc", demo::ADMIN).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

async fn spawn_superset() -> String {
    async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["provider"] == "db" && body["username"] == "admin" {
            (StatusCode::OK, Json(json!({ "access_token": "admin-token" })))
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad" })))
        }
    }

    async fn guest_token(Json(body): Json<Value>) -> Json<Value> {
        let id = body["resources"][0]["id"].as_str().unwrap_or_default().to_string();
        Json(json!({ "token": format!("guest-{}", id) }))
    }

    let router = Router::new()
        .route("/api/v1/security/login", post(login))
        .route("/api/v1/security/guest_token/", post(guest_token));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn superset_exchanges_admin_login_for_guest_token() {
    let mut config = AppConfig::development();
    config.superset.domain = spawn_superset().await;
    config.superset.username = "admin".to_string();
    config.superset.password = "secret".to_string();
    let app = test_app_with(config.clone());

    let res = app.get("/api/superset/token?id=42", demo::ADMIN).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()["token"], "guest-42");

    config.superset.username = "intruso".to_string();
    let app = test_app_with(config);
    let res = app.get("/api/superset/token?id=42", demo::ADMIN).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json()["error"], "Superset Login falló: 401");
}
