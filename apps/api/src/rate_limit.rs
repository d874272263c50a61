//! Per-client-IP rate limiting for the scoring routes.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::state::AppState;

pub type IpRateLimiter =
    RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

/// Allows `per_minute` requests per IP, with the full minute's quota as burst.
pub fn build_ip_limiter(per_minute: u32) -> Arc<IpRateLimiter> {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// How often idle per-IP entries are dropped from the keyed store.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Drops entries whose quota has fully replenished; they are
/// indistinguishable from a client never seen before.
pub fn prune_idle(limiter: &IpRateLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    debug!(tracked = limiter.len(), "Pruned rate limiter state");
}

pub fn spawn_pruning(limiter: Arc<IpRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            prune_idle(&limiter);
        }
    })
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

/// Requests without connection info (in-process tests) are not limited.
pub fn enforce(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), AppError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            warn!(%client_ip, "Rate limit exceeded");
            return Err(AppError::TooManyRequests);
        }
    }
    Ok(())
}

pub async fn scoring_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.rate_limiter, request_ip(&req))?;
    Ok(next.run(req).await)
}
