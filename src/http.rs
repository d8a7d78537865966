//! HTTP surface: routing, authentication, and response envelopes
//!
//! One endpoint, `POST /`, behind an `App-Key` shared-secret check. Every
//! response is a JSON envelope: `{"status":"success","data":{...}}` or
//! `{"status":"error","message":"..."}`. Renderer and filesystem failures
//! never escape as transport errors; they are mapped to the envelope here.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Semaphore;

use crate::config::ServiceConfig;
use crate::{produce, validate, Error, RenderJob, Renderer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

struct StateInner {
    renderer: Arc<dyn Renderer>,
    app_key: String,
    scratch_dir: PathBuf,
    debug: bool,
    render_slots: Semaphore,
}

impl AppState {
    pub fn new(renderer: Arc<dyn Renderer>, config: &ServiceConfig) -> Self {
        Self {
            inner: Arc::new(StateInner {
                renderer,
                app_key: config.app_key.clone(),
                scratch_dir: config.scratch_dir(),
                debug: config.debug,
                render_slots: Semaphore::new(config.render_slots()),
            }),
        }
    }
}

/// Build the axum router: `POST /` plus a uniform 404 for everything else,
/// all behind the App-Key middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(render).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_app_key,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct SuccessBody {
    status: &'static str,
    data: RenderData,
}

#[derive(Serialize)]
struct RenderData {
    base64: String,
    size: u64,
    mime_type: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message: message.into(),
        }),
    )
        .into_response()
}

// Runs before routing, so a bad key is 401 no matter the path or body. The
// comparison is constant-time; a missing header compares as empty.
async fn require_app_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get("App-Key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if presented
        .as_bytes()
        .ct_eq(state.inner.app_key.as_bytes())
        .unwrap_u8()
        == 0
    {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized: invalid App-Key");
    }

    next.run(request).await
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn render(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, "request body must be valid JSON")
        }
    };

    let violations = validate(&payload);
    if !violations.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, violations.join(", "));
    }

    let job = match RenderJob::from_payload(&payload) {
        Ok(job) => job,
        Err(err) => return failure(&state, err),
    };

    // Renders are bounded by the configured slot count; excess requests
    // queue here rather than stacking up browser processes.
    let _permit = match state.inner.render_slots.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };

    log::info!(
        "rendering {:?} -> {:?}",
        job.content_kind,
        job.output_kind
    );

    match produce(
        state.inner.renderer.clone(),
        job,
        &state.inner.scratch_dir,
    )
    .await
    {
        Ok(result) => {
            let data = RenderData {
                base64: STANDARD.encode(&result.bytes),
                size: result.size,
                mime_type: result.mime_type,
            };
            (
                StatusCode::OK,
                Json(SuccessBody {
                    status: "success",
                    data,
                }),
            )
                .into_response()
        }
        Err(err) => failure(&state, err),
    }
}

// Validation details always go back to the caller; everything else is an
// environment or renderer malfunction whose detail stays in the logs unless
// debug mode is on.
fn failure(state: &AppState, err: Error) -> Response {
    match err {
        Error::Validation(violations) => {
            error_response(StatusCode::BAD_REQUEST, violations.join(", "))
        }
        err => {
            log::error!("render failed: {}", err);
            let message = if state.inner.debug {
                err.to_string()
            } else {
                "Internal server error".to_string()
            };
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
