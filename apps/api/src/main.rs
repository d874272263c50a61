use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matcher_api::config::Config;
use matcher_api::embeddings::build_embedder;
use matcher_api::matching::pipeline::MatchPipeline;
use matcher_api::rate_limit::{spawn_pruning, PRUNE_INTERVAL};
use matcher_api::routes::build_router;
use matcher_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    // Embedding model is loaded on first use, not here
    let embedder = build_embedder(&config.embedding);
    info!(
        "Embedding client configured (model: {}, concurrent inference: {})",
        config.embedding.model, config.embedding.concurrent_inference
    );

    let pipeline = Arc::new(MatchPipeline::new(embedder));
    let state = AppState::new(config.clone(), pipeline);
    spawn_pruning(state.rate_limiter.clone(), PRUNE_INTERVAL);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
