use axum::{routing::get, Router};
use std::sync::Arc;

use forensics_queue::JobQueue;

/// Shared state for the HTTP surface (just `/health` — spec §5).
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub max_pending_jobs: i64,
    pub worker_count: usize,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
