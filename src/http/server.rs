//! axum router and server for the MCP endpoint

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ServerConfig, REQUEST_TIMEOUT_MARGIN};
use crate::error::{codes, GatewayError};
use crate::mcp::{parse_message, Dispatcher, McpHandler, McpResponse};

/// Header that names the session on every request after `initialize`
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

/// Interval between SSE keep-alive comments
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

/// Build the router with CORS, tracing, timeout and body-limit layers.
///
/// The request timeout never undercuts the dispatcher's tool timeout, so
/// slow tools still answer with a JSON-RPC envelope.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let request_timeout = config
        .request_timeout
        .max(state.dispatcher.tool_timeout() + REQUEST_TIMEOUT_MARGIN);
    let session_header = HeaderName::from_static(MCP_SESSION_ID_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, session_header.clone()])
        .expose_headers([session_header]);

    Router::new()
        .route(
            "/mcp",
            post(handle_post).get(handle_stream).delete(handle_delete),
        )
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// HTTP server for the MCP endpoint
pub struct McpHttpServer {
    state: AppState,
    config: ServerConfig,
}

impl McpHttpServer {
    pub fn new(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(dispatcher),
            config,
        }
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state, &self.config);

        let listener = tokio::net::TcpListener::bind(self.config.bind).await?;
        tracing::info!(
            "MCP HTTP server listening on http://{}/mcp",
            listener.local_addr()?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                tracing::info!("Shutting down");
            })
            .await?;

        Ok(())
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// JSON-RPC body with the session header attached when known
fn rpc_response(status: StatusCode, session: Option<&str>, body: &McpResponse) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(value) = session.and_then(|s| HeaderValue::from_str(s).ok()) {
        response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
    }
    response
}

fn invalid_session(session: Option<&str>) -> Response {
    let err = GatewayError::InvalidSession(session.map(str::to_string));
    rpc_response(
        StatusCode::BAD_REQUEST,
        None,
        &McpResponse::from_error(None, err),
    )
}

async fn handle_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request = match parse_message(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected JSON-RPC payload: {}", e);
            return rpc_response(
                StatusCode::BAD_REQUEST,
                None,
                &McpResponse::from_error(None, e),
            );
        }
    };

    let exchange = state
        .dispatcher
        .handle_request(session_id(&headers), request)
        .await;
    let session = exchange.session_id.as_deref();

    match exchange.response {
        None => {
            let mut response = StatusCode::ACCEPTED.into_response();
            if let Some(value) = session.and_then(|s| HeaderValue::from_str(s).ok()) {
                response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
            }
            response
        }
        Some(response) => {
            let status = match response.error_code() {
                Some(codes::INVALID_SESSION) | Some(codes::INVALID_REQUEST) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::OK,
            };
            rpc_response(status, session, &response)
        }
    }
}

async fn handle_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let requested = session_id(&headers);
    let session = match requested.map(|id| state.dispatcher.sessions().lookup(id)) {
        Some(Ok(session)) => session,
        _ => return invalid_session(requested),
    };
    tracing::debug!("Opening event stream for session {}", session.id());

    Sse::new(push_events(session.subscribe()))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

/// Session messages as SSE events; ends when the session is dropped
fn push_events(
    rx: tokio::sync::broadcast::Receiver<Value>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|message| async move {
        match message {
            Ok(value) => Some(Ok(Event::default().event("message").data(value.to_string()))),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Event stream lagged, dropped {} messages", skipped);
                None
            }
        }
    })
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_id(&headers) {
        Some(id) if state.dispatcher.close_session(id) => StatusCode::NO_CONTENT.into_response(),
        requested => invalid_session(requested),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": state.dispatcher.sessions().len(),
        "tools": state.dispatcher.catalog().len(),
    }))
}
