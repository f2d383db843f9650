use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Value,
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({
                "candidates": [
                    { "content": { "role": "model", "parts": [{ "text": text }] } }
                ]
            }),
        }
    }

    pub fn no_candidates() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "candidates": [] }),
        }
    }

    pub fn provider_error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": { "code": status.as_u16(), "message": message } }),
        }
    }
}

#[derive(Debug, Clone)]
struct UpstreamState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_keys: Arc<Mutex<Vec<String>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
}

/// Stand-in for the provider's `generateContent` endpoint.
pub struct MockGemini {
    pub url: String,
    state: UpstreamState,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl MockGemini {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = UpstreamState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_keys: Arc::new(Mutex::new(Vec::new())),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/generate", post(generate_content_handler))
            .with_state(state.clone());
        let (base_url, shutdown_tx, server_task) = super::serve(app).await;

        Self {
            url: format!("{base_url}/generate"),
            state,
            shutdown_tx,
            server_task,
        }
    }

    pub async fn seen_keys(&self) -> Vec<String> {
        self.state.seen_keys.lock().await.clone()
    }

    pub async fn seen_bodies(&self) -> Vec<Value> {
        self.state.seen_bodies.lock().await.clone()
    }

    pub async fn stop(self) {
        self.shutdown_tx
            .send(())
            .expect("shutdown signal should send");
        self.server_task.await.expect("server task should join");
    }
}

async fn generate_content_handler(
    State(state): State<UpstreamState>,
    Query(query): Query<HashMap<String, String>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some(key) = query.get("key") {
        state.seen_keys.lock().await.push(key.clone());
    }
    state.seen_bodies.lock().await.push(payload);

    let reply = state.replies.lock().await.pop_front().unwrap_or_else(|| {
        MockReply::provider_error(StatusCode::INTERNAL_SERVER_ERROR, "exhausted test replies")
    });

    (reply.status, Json(reply.body))
}
