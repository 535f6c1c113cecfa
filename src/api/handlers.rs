//! Request handlers.

use super::AppState;
use crate::core::sweep::run_sweep;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use tracing::error;

/// `GET /api/cron/seguimientos` - runs one follow-up sweep.
pub async fn run_follow_up_sweep(State(state): State<AppState>) -> impl IntoResponse {
    match run_sweep(&state.db, &state.dispatcher, Utc::now()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "processed": report.processed })),
        ),
        Err(e) => {
            error!(error = %e, "Follow-up sweep failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
        }
    }
}

/// `GET /health` - liveness probe.
pub async fn health() -> &'static str {
    "OK"
}
