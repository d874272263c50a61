use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub embedding: EmbeddingConfig,
    /// Upper bound for uploaded résumé files, in MiB.
    pub max_upload_mb: usize,
    /// Requests per minute per client IP on the scoring routes.
    pub rate_limit_per_minute: u32,
}

/// Connection settings for the external embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Request-level timeout applied to every embedding call.
    pub timeout: Duration,
    /// When false, inference calls are serialized through a single slot.
    pub concurrent_inference: bool,
}

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080_u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            embedding: EmbeddingConfig {
                api_url: require_env("EMBEDDING_API_URL")?,
                model: std::env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
                api_key: std::env::var("EMBEDDING_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                timeout: Duration::from_secs(
                    parse_env("EMBEDDING_TIMEOUT_SECS", 30_u64)
                        .context("EMBEDDING_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                concurrent_inference: std::env::var("EMBEDDING_CONCURRENT_INFERENCE")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
            max_upload_mb: parse_env("MAX_UPLOAD_MB", 2_usize)
                .context("MAX_UPLOAD_MB must be a positive integer")?,
            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE", 10_u32)
                .context("RATE_LIMIT_PER_MINUTE must be a positive integer")?,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    /// Configuration used by in-crate tests; never reads the environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            port: 8080,
            rust_log: "debug".to_string(),
            embedding: EmbeddingConfig {
                api_url: "http://localhost:8001".to_string(),
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
                api_key: None,
                timeout: Duration::from_secs(5),
                concurrent_inference: false,
            },
            max_upload_mb: 2,
            rate_limit_per_minute: 10,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for '{key}'")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
