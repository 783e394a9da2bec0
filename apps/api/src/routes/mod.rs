pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::matching::handlers as matching;
use crate::scoring::handlers as scoring;
use crate::state::AppState;

/// One job offer plus five CVs.
const SCORING_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Streaming scoring (SSE)
        .route(
            "/api/scoring",
            post(scoring::handle_scoring).layer(DefaultBodyLimit::max(SCORING_BODY_LIMIT)),
        )
        // Matching
        .route("/api/matching/analyze", post(matching::handle_analyze))
        .route(
            "/api/matching/jobscan-analysis",
            post(matching::handle_jobscan),
        )
        .with_state(state)
}
