//! REST API route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use staysearch_core::{HostLoop, Query, SearchError};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub max_steps: u32,
    pub servers: Vec<String>,
    pub agent_constructed: bool,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        max_steps: state.max_steps,
        servers: state.servers.clone(),
        agent_constructed: state.cache.is_constructed(),
    })
}

// ---------------------------------------------------------------------------
// POST /api/search
// ---------------------------------------------------------------------------

/// Request body for `/api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub query: String,
}

/// Run one travel query.
///
/// Blank input is answered with a 400 warning without touching the agent.
/// Otherwise the cached agent is built if needed and the query is driven to
/// completion on the server's runtime.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> (StatusCode, Json<Value>) {
    let query = match Query::parse(body.query) {
        Ok(query) => query,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "warning", "message": e.to_string()})),
            );
        }
    };

    let cache = Arc::clone(&state.cache);
    let factory = Arc::clone(&state.factory);
    let outcome = HostLoop::detect()
        .run_to_completion(async move {
            let pair = cache.get_or_try_init(|| factory()).await?;
            pair.run(&query).await
        })
        .and_then(|result| result);

    match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({"status": "success", "result": result})),
        ),
        Err(e) => {
            log_failure(&e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "failed", "error": e.to_string()})),
            )
        }
    }
}

fn log_failure(err: &SearchError) {
    if err.is_step_budget_exceeded() {
        tracing::warn!(error = %err, "search ran out of steps");
    } else {
        tracing::error!(error = %err, "search failed");
    }
}
