//! Streamable HTTP transport tests, driven through the router with `oneshot`
//!
//! Run with: cargo test --test http_transport

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use taskgate::collaborators::{
    Collaborators, InMemoryTaskStore, KnowledgeBase, TaskFixture, WebSearch,
};
use taskgate::config::ServerConfig;
use taskgate::error::Result;
use taskgate::http::{router, AppState, MCP_SESSION_ID_HEADER};
use taskgate::mcp::{build_catalog, Dispatcher, SessionRegistry};
use taskgate::types::{KnowledgeHit, SafeSearch, TaskItem, WebResult};

struct EmptyKnowledge;

#[async_trait::async_trait]
impl KnowledgeBase for EmptyKnowledge {
    async fn search(&self, _: &str, _: usize, _: Option<&[String]>) -> Result<Vec<KnowledgeHit>> {
        Ok(vec![])
    }
}

struct EmptyWeb;

#[async_trait::async_trait]
impl WebSearch for EmptyWeb {
    async fn search(&self, _: &str, _: usize, _: SafeSearch) -> Result<Vec<WebResult>> {
        Ok(vec![])
    }
}

struct SlowKnowledge;

#[async_trait::async_trait]
impl KnowledgeBase for SlowKnowledge {
    async fn search(&self, _: &str, _: usize, _: Option<&[String]>) -> Result<Vec<KnowledgeHit>> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(vec![])
    }
}

fn app() -> Router {
    let tasks = InMemoryTaskStore::from_fixture(TaskFixture {
        inbox: vec![TaskItem::new("T1", "Buy milk")],
        tags: vec!["work".into(), "home".into()],
        ..TaskFixture::default()
    });
    let collaborators = Collaborators {
        tasks: Arc::new(tasks),
        knowledge: Arc::new(EmptyKnowledge),
        web: Arc::new(EmptyWeb),
    };
    let config = ServerConfig::default();
    let catalog = build_catalog(&collaborators, config.today_cap).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(SessionRegistry::new()), Arc::new(catalog));
    router(AppState::new(dispatcher), &config)
}

fn post(session: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(MCP_SESSION_ID_HEADER, id);
    }
    builder.body(body.into()).unwrap()
}

fn rpc(id: i64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

/// Router whose request timeout is configured no longer than the tool timeout
fn slow_app(tool_timeout: Duration) -> Router {
    let collaborators = Collaborators {
        tasks: Arc::new(InMemoryTaskStore::from_fixture(TaskFixture::default())),
        knowledge: Arc::new(SlowKnowledge),
        web: Arc::new(EmptyWeb),
    };
    let config = ServerConfig {
        tool_timeout,
        request_timeout: tool_timeout,
        ..ServerConfig::default()
    };
    let catalog = build_catalog(&collaborators, config.today_cap).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(SessionRegistry::new()), Arc::new(catalog))
        .with_tool_timeout(tool_timeout);
    router(AppState::new(dispatcher), &config)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn initialize(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post(None, rpc(1, "initialize", json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .headers()
        .get(MCP_SESSION_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_initialize_then_call_tool() {
    let app = app();
    let sid = initialize(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            Some(&sid),
            rpc(2, "tools/call", json!({"name": "get_things3_tags"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(MCP_SESSION_ID_HEADER).unwrap(),
        sid.as_str()
    );
    let body = json_body(response).await;
    assert_eq!(body["id"], 2);
    assert_eq!(
        body["result"]["content"][0]["text"],
        "Available Things3 tags:\n• work\n• home"
    );
}

#[tokio::test]
async fn test_missing_session_is_bad_request() {
    let app = app();
    let response = app
        .oneshot(post(None, rpc(2, "tools/list", json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(
        body["error"]["message"],
        "Bad Request: No valid session ID provided"
    );
}

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let app = app();
    let response = app.oneshot(post(None, "{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_request_without_method_is_invalid_request() {
    let app = app();
    let response = app
        .oneshot(post(None, json!({"jsonrpc": "2.0", "id": 1}).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_slow_tool_answers_with_error_envelope() {
    let app = slow_app(Duration::from_millis(100));
    let sid = initialize(&app).await;

    let response = app
        .oneshot(post(
            Some(&sid),
            rpc(
                2,
                "tools/call",
                json!({"name": "search_knowledge_base", "arguments": {"query": "rust"}}),
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], 2);
    assert_eq!(body["result"]["isError"], true);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("timed out"), "unexpected text: {text}");
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let app = app();
    let sid = initialize(&app).await;
    let response = app
        .oneshot(post(
            Some(&sid),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_delete_then_reuse_is_rejected() {
    let app = app();
    let sid = initialize(&app).await;

    let delete = |id: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri("/mcp")
            .header(MCP_SESSION_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(delete(&sid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(delete(&sid)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post(Some(&sid), rpc(3, "tools/list", json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_requires_valid_session() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .header(MCP_SESSION_ID_HEADER, "not-a-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let sid = initialize(&app).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .header(MCP_SESSION_ID_HEADER, &sid)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_health_reports_sessions_and_tools() {
    let app = app();
    initialize(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body, json!({"status": "ok", "sessions": 1, "tools": 8}));
}
