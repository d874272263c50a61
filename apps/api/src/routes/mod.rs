pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::rate_limit::scoring_rate_limit;
use crate::state::AppState;

/// Multipart framing and the job description ride on top of the file itself.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes() + BODY_OVERHEAD_BYTES;

    let scoring = Router::new()
        .route("/analyze", post(handlers::handle_analyze))
        .route("/api/v1/match", post(handlers::handle_match))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            scoring_rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(scoring)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
