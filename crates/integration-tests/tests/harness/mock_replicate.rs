//! Mock Replicate backend for integration tests
//!
//! Implements the prediction create and poll endpoints with scripted outcomes

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const PREDICTION_ID: &str = "pred-0001";

/// How the mock answers prediction requests
#[derive(Clone)]
pub enum Outcome {
    /// Finish synchronously with this output
    Succeed(Value),
    /// Report `processing` for `polls` poll requests, then succeed
    SucceedAfterPolls { polls: u32, output: Value },
    /// Never leave `processing`
    Hang,
    /// Finish with status `failed` and this error text
    Fail(String),
    /// Answer the create request with a non-2xx status and raw body
    Reject { status: u16, body: String },
}

/// A prediction create request as received by the mock
#[derive(Debug, Clone)]
pub struct RecordedPrediction {
    /// Request path, to tell versioned and model-scoped endpoints apart
    pub path: String,
    pub authorization: Option<String>,
    pub prefer: Option<String>,
    pub version: Option<String>,
    pub input: Value,
}

/// Mock Replicate backend with a single scripted outcome
pub struct MockReplicate {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    addr: SocketAddr,
    outcome: Outcome,
    predictions: Mutex<Vec<RecordedPrediction>>,
    poll_count: AtomicU32,
}

impl MockReplicate {
    /// Start a mock that succeeds immediately with `output`
    pub async fn start(output: Value) -> anyhow::Result<Self> {
        Self::start_with(Outcome::Succeed(output)).await
    }

    /// Start a mock with an arbitrary outcome
    pub async fn start_with(outcome: Outcome) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            addr,
            outcome,
            predictions: Mutex::new(Vec::new()),
            poll_count: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/v1/predictions", routing::post(handle_create))
            .route("/v1/models/{owner}/{name}/predictions", routing::post(handle_create))
            .route("/v1/predictions/{id}", routing::get(handle_poll))
            .with_state(Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the inference endpoint
    ///
    /// Includes `/v1` since the provider appends `/predictions` and `/models/...`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Prediction create requests received so far
    pub fn predictions(&self) -> Vec<RecordedPrediction> {
        self.state.predictions.lock().unwrap().clone()
    }

    /// Number of create requests received
    pub fn prediction_count(&self) -> usize {
        self.state.predictions.lock().unwrap().len()
    }

    /// Number of poll requests received
    pub fn poll_count(&self) -> u32 {
        self.state.poll_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockReplicate {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Deserialize)]
struct CreatePrediction {
    #[serde(default)]
    version: Option<String>,
    input: Value,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn prediction(state: &MockState, status: &str, output: Option<&Value>, error: Option<&str>) -> Value {
    json!({
        "id": PREDICTION_ID,
        "status": status,
        "output": output,
        "error": error,
        "urls": {
            "get": format!("http://{}/v1/predictions/{PREDICTION_ID}", state.addr),
            "cancel": format!("http://{}/v1/predictions/{PREDICTION_ID}/cancel", state.addr),
        }
    })
}

async fn handle_create(
    State(state): State<Arc<MockState>>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<CreatePrediction>,
) -> Response {
    state.predictions.lock().unwrap().push(RecordedPrediction {
        path: uri.path().to_owned(),
        authorization: header(&headers, "authorization"),
        prefer: header(&headers, "prefer"),
        version: body.version,
        input: body.input,
    });

    match &state.outcome {
        Outcome::Succeed(output) => Json(prediction(&state, "succeeded", Some(output), None)).into_response(),
        Outcome::SucceedAfterPolls { .. } | Outcome::Hang => {
            (StatusCode::CREATED, Json(prediction(&state, "starting", None, None))).into_response()
        }
        Outcome::Fail(message) => Json(prediction(&state, "failed", None, Some(message))).into_response(),
        Outcome::Reject { status, body } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body.clone()).into_response()
        }
    }
}

async fn handle_poll(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    if id != PREDICTION_ID {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response();
    }

    let polls = state.poll_count.fetch_add(1, Ordering::Relaxed) + 1;

    let body = match &state.outcome {
        Outcome::SucceedAfterPolls { polls: needed, output } if polls >= *needed => {
            prediction(&state, "succeeded", Some(output), None)
        }
        Outcome::Succeed(output) => prediction(&state, "succeeded", Some(output), None),
        _ => prediction(&state, "processing", None, None),
    };

    Json(body).into_response()
}
