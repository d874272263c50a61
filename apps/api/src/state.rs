use std::sync::Arc;

use crate::config::Config;
use crate::matching::pipeline::MatchPipeline;
use crate::rate_limit::{build_ip_limiter, IpRateLimiter};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Scoring pipeline with its injected embedder; the embedding model is
    /// loaded lazily on the first request.
    pub pipeline: Arc<MatchPipeline>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, pipeline: Arc<MatchPipeline>) -> Self {
        let rate_limiter = build_ip_limiter(config.rate_limit_per_minute);
        Self {
            config,
            pipeline,
            rate_limiter,
        }
    }
}
