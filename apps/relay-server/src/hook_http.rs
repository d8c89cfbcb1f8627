//! # Hook Receiver
//!
//! HTTP endpoint for the upload engine's hook requests.
//!
//! ## Request Shape
//! ```text
//! POST /hooks
//! Hook-Name: pre-create | post-create | post-receive | post-finish | post-terminate
//! Content-Type: application/json
//!
//! {"Upload": {"ID": "...", "Size": 12, "Offset": 0, "MetaData": {"data": "...", "filename": "..."}}}
//! ```
//!
//! ## Responses
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ Hook             │ Response                                             │
//! ├──────────────────┼──────────────────────────────────────────────────────┤
//! │ pre-create       │ 200 admitted, 400 + reason if rejected               │
//! │                  │ 500 if the check itself failed                       │
//! │ post-*           │ 200 once queued for the dispatcher                   │
//! │                  │ 503 if the dispatcher is gone                        │
//! │ unknown          │ 200, ignored                                         │
//! │ no Hook-Name     │ 400                                                  │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::engine::{EngineNotifiers, HookKind, PreCreateHook, UploadInfo};

/// Header naming the hook being invoked.
pub const HOOK_NAME_HEADER: &str = "hook-name";

/// Path the engine posts hooks to.
pub const HOOKS_PATH: &str = "/hooks";

/// Shared state of the hook routes.
#[derive(Clone)]
pub struct HookState {
    pre_create: Arc<dyn PreCreateHook>,
    notifiers: EngineNotifiers,
}

impl HookState {
    pub fn new(pre_create: Arc<dyn PreCreateHook>, notifiers: EngineNotifiers) -> Self {
        HookState {
            pre_create,
            notifiers,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HookRequest {
    #[serde(rename = "Upload", default)]
    upload: UploadInfo,
}

/// Builds the hook router.
pub fn router(state: HookState) -> Router {
    Router::new()
        .route(HOOKS_PATH, post(hook_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn hook_handler(
    State(state): State<HookState>,
    headers: HeaderMap,
    Json(request): Json<HookRequest>,
) -> Response {
    let Some(name) = headers
        .get(HOOK_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return (StatusCode::BAD_REQUEST, "missing Hook-Name header").into_response();
    };

    let Some(kind) = HookKind::from_name(name) else {
        debug!(hook = %name, "Ignoring unhandled hook");
        return StatusCode::OK.into_response();
    };

    let info = request.upload;
    match kind {
        HookKind::PreCreate => match state.pre_create.pre_create(&info).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) if e.is_rejection() => {
                debug!(hook = %kind, error = %e, "Upload rejected");
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            Err(e) => {
                warn!(hook = %kind, error = %e, "Admission check failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        _ => {
            let session_id = info.id.clone();
            match state.notifiers.notify(kind, info).await {
                Ok(()) => StatusCode::OK.into_response(),
                Err(e) => {
                    warn!(hook = %kind, session_id = %session_id, error = %e, "Dropping hook");
                    (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
                }
            }
        }
    }
}
