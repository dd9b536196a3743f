use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe (spec §5): queue depth, worker liveness,
/// and whether the queue is currently applying backpressure.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let pending = state.queue.pending_count().unwrap_or(-1);
    let backpressured = pending >= 0 && pending >= state.max_pending_jobs;

    Json(json!({
        "status": "ok",
        "queue_depth": pending,
        "worker_count": state.worker_count,
        "backpressured": backpressured,
    }))
}
