//! In-process transcription backend double used by the integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

/// What the double answers to a transcription upload.
#[derive(Clone)]
pub enum Reply {
    Json(String),
    Status(u16, String),
    DelayedJson(Duration, String),
}

/// One multipart upload as the double saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct BackendState {
    reply: Reply,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

pub struct TestBackend {
    pub url: String,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl TestBackend {
    pub async fn spawn(reply: Reply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            reply,
            received: Arc::clone(&received),
        };
        let app = Router::new()
            .route("/api/transcribe", post(transcribe))
            .route("/api/health", get(health))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test backend");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test backend");
        });
        Self {
            url: format!("http://{addr}"),
            received,
        }
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.received.lock().unwrap().clone()
    }

    pub fn last_upload(&self) -> Option<ReceivedUpload> {
        self.received.lock().unwrap().last().cloned()
    }
}

/// Canned success payload in the backend's response shape.
pub fn transcript_json(text: &str) -> String {
    serde_json::json!({
        "text": text,
        "language": "en",
        "duration_sec": 1.5,
        "model": "small",
        "device": "cpu",
    })
    .to_string()
}

async fn transcribe(State(state): State<BackendState>, mut multipart: Multipart) -> Response {
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        state.received.lock().unwrap().push(ReceivedUpload {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }
    match state.reply.clone() {
        Reply::Json(body) => {
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Reply::Status(code, body) => {
            let status = StatusCode::from_u16(code).expect("valid status code");
            (status, body).into_response()
        }
        Reply::DelayedJson(delay, body) => {
            tokio::time::sleep(delay).await;
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

async fn health() -> Response {
    axum::Json(serde_json::json!({ "status": "ok" })).into_response()
}
