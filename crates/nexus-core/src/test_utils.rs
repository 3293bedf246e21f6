//! Test utilities for nexus-core
//!
//! Mock HTTP servers speaking the OpenAI-compatible chat API and the Gemini
//! API. Each server plays back one scripted reply (JSON, SSE stream or an
//! error status) and records every request it receives.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// What a mock server answers with
#[derive(Debug, Clone)]
pub enum ServerReply {
    /// Completion text (sent as one SSE event when streaming is requested)
    Text(String),
    /// SSE chunks (joined when a non-streaming call is made)
    Chunks(Vec<String>),
    /// Error status with a message in the provider's error envelope
    Status(u16, String),
}

impl ServerReply {
    pub fn text(text: &str) -> Self {
        ServerReply::Text(text.to_string())
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        ServerReply::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }

    pub fn status(code: u16, message: &str) -> Self {
        ServerReply::Status(code, message.to_string())
    }

    fn chunk_list(&self) -> Vec<String> {
        match self {
            ServerReply::Text(text) => vec![text.clone()],
            ServerReply::Chunks(chunks) => chunks.clone(),
            ServerReply::Status(..) => Vec::new(),
        }
    }

    fn full_text(&self) -> String {
        self.chunk_list().concat()
    }
}

/// A request received by a mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    /// `Authorization` header (OpenAI-compatible)
    pub authorization: Option<String>,
    /// `key` query parameter (Gemini)
    pub api_key: Option<String>,
    pub body: Value,
}

struct ServerState {
    reply: ServerReply,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ServerState {
    fn record(&self, request: RecordedRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

/// Shared lifecycle for the mock servers
struct MockServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: Arc<ServerState>,
}

impl MockServer {
    async fn start(app: Router<Arc<ServerState>>, reply: ServerReply) -> Self {
        let state = Arc::new(ServerState {
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let app = app.with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Mock OpenAI-compatible chat completions server
pub struct MockOpenAIServer {
    inner: MockServer,
}

impl MockOpenAIServer {
    /// Start the mock server on an available port
    pub async fn start(reply: ServerReply) -> Self {
        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/models", get(handle_models));

        Self {
            inner: MockServer::start(app, reply).await,
        }
    }

    /// Base URL including the version segment
    pub fn url(&self) -> String {
        format!("http://{}/v1", self.inner.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests()
    }
}

/// Mock Gemini generative language server
pub struct MockGeminiServer {
    inner: MockServer,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start(reply: ServerReply) -> Self {
        let app = Router::new()
            .route("/v1beta/models", get(handle_models))
            .route("/v1beta/models/:action", post(handle_gemini));

        Self {
            inner: MockServer::start(app, reply).await,
        }
    }

    /// Base URL including the version segment
    pub fn url(&self) -> String {
        format!("http://{}/v1beta", self.inner.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests()
    }
}

/// Model listing (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({ "data": [{ "id": "mock-model" }], "models": [{ "name": "models/mock-model" }] }))
}

fn error_response(code: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

fn sse_response(events: Vec<Value>, done_marker: bool) -> Response {
    let mut body = String::new();
    for event in events {
        body.push_str(&format!("data: {}\n\n", event));
    }
    if done_marker {
        body.push_str("data: [DONE]\n\n");
    }
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// OpenAI chat completions endpoint
async fn handle_chat_completions(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<Value>,
) -> Response {
    let streaming = body["stream"].as_bool().unwrap_or(false);
    state.record(RecordedRequest {
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        api_key: None,
        body,
    });

    if let ServerReply::Status(code, message) = &state.reply {
        return error_response(*code, message);
    }

    if streaming {
        let events = state
            .reply
            .chunk_list()
            .into_iter()
            .map(|chunk| json!({ "choices": [{ "index": 0, "delta": { "content": chunk } }] }))
            .collect();
        return sse_response(events, true);
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": state.reply.full_text() },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Gemini `models/{model}:{method}` endpoint
async fn handle_gemini(
    State(state): State<Arc<ServerState>>,
    Path(action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Response {
    state.record(RecordedRequest {
        path: uri.path().to_string(),
        authorization: None,
        api_key: query.get("key").cloned(),
        body,
    });

    if let ServerReply::Status(code, message) = &state.reply {
        return error_response(*code, message);
    }

    let candidate = |text: String| {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    };

    if action.ends_with(":embedContent") {
        Json(json!({ "embedding": { "values": [0.1, 0.2, 0.3, 0.4] } })).into_response()
    } else if action.ends_with(":streamGenerateContent") {
        let events = state.reply.chunk_list().into_iter().map(candidate).collect();
        sse_response(events, false)
    } else {
        Json(candidate(state.reply.full_text())).into_response()
    }
}
