//! In-process stand-in for the question-answering backend.
//!
//! Serves `/files`, `/upload`, `/query` and `/clear` on an ephemeral port.
//! A query of `"boom"` answers HTTP 500; `fail_uploads` makes `/upload`
//! answer HTTP 503.

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockState {
    pub files: Arc<Mutex<Vec<String>>>,
    pub uploaded_bytes: Arc<AtomicUsize>,
    pub queries: Arc<Mutex<Vec<String>>>,
    pub clears: Arc<AtomicUsize>,
    pub fail_uploads: Arc<AtomicBool>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: MockState,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::start_with(MockState::default()).await
    }

    pub async fn start_with(state: MockState) -> Self {
        let app = Router::new()
            .route("/files", get(list_files))
            .route("/upload", post(upload))
            .route("/query", post(query))
            .route("/clear", post(clear))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn list_files(State(state): State<MockState>) -> Json<Value> {
    let files = state.files.lock().unwrap().clone();
    Json(json!({ "files": files }))
}

async fn upload(State(state): State<MockState>, mut multipart: Multipart) -> StatusCode {
    if state.fail_uploads.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("files") {
            return StatusCode::BAD_REQUEST;
        }
        let name = field.file_name().unwrap_or("unnamed").to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST;
        };
        state.uploaded_bytes.fetch_add(bytes.len(), Ordering::SeqCst);
        state.files.lock().unwrap().push(name);
    }
    StatusCode::OK
}

async fn query(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let text = body["query"].as_str().unwrap_or_default().to_string();
    state.queries.lock().unwrap().push(text.clone());
    if text == "boom" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "pipeline exploded").into_response();
    }

    Json(json!({
        "answer": format!(
            "Either party may terminate with 30 days notice.\nGeneration Process:\nretrieved 2 passages for '{}'",
            text
        ),
        "evidence": [
            {
                "rank": 1,
                "filename": "contract.pdf",
                "page": 9,
                "text": "Either party may terminate this agreement upon thirty (30) days written notice.",
                "score": 0.912,
                "match_percent": 91.2,
                "status": "High Match"
            },
            {
                "rank": 2,
                "filename": "contract.pdf",
                "page": 10,
                "text": "Termination does not relieve obligations accrued prior.",
                "score": 0.85,
                "match_percent": 85.0,
                "status": "Match"
            }
        ],
        "verification": "Answer is supported by page 9."
    }))
    .into_response()
}

async fn clear(State(state): State<MockState>) -> StatusCode {
    state.clears.fetch_add(1, Ordering::SeqCst);
    state.files.lock().unwrap().clear();
    StatusCode::OK
}
