//! Embedding collaborator — the only stateful, potentially blocking resource
//! in the scoring path.
//!
//! `LazyEmbedder` wraps a `ModelLoader` behind a one-time async init guard:
//! concurrent first callers share a single load, a failed load is not cached,
//! and inference is either concurrent or serialized through one slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};
use tracing::info;

use crate::config::EmbeddingConfig;

pub mod remote;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding model failed to load: {0}")]
    Load(String),

    #[error("Embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed embedding response: {0}")]
    Malformed(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding service unavailable after {retries} retries")]
    Unavailable { retries: u32 },
}

/// Turns texts into fixed-length vectors. Implementations must return one
/// vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Produces a ready-to-use model. Called at most once per successful load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Embedder>, EmbeddingError>;
}

pub struct LazyEmbedder {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn Embedder>>,
    inference_slot: Option<Semaphore>,
    timeout: Duration,
}

impl LazyEmbedder {
    pub fn new(loader: Arc<dyn ModelLoader>, timeout: Duration, concurrent_inference: bool) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            inference_slot: (!concurrent_inference).then(|| Semaphore::new(1)),
            timeout,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<&Arc<dyn Embedder>, EmbeddingError> {
        self.model
            .get_or_try_init(|| async {
                info!("Loading embedding model...");
                let started = Instant::now();
                let model = self.loader.load().await?;
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Embedding model ready"
                );
                Ok::<_, EmbeddingError>(model)
            })
            .await
    }
}

#[async_trait]
impl Embedder for LazyEmbedder {
    /// The load itself is not subject to `timeout`; only inference is. A slow
    /// first load must be allowed to finish for every later caller.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = self.model().await?;

        let inference = async {
            let _permit = match &self.inference_slot {
                Some(slot) => Some(
                    slot.acquire()
                        .await
                        .map_err(|_| EmbeddingError::Load("inference slot closed".to_string()))?,
                ),
                None => None,
            };
            model.embed(texts).await
        };

        tokio::time::timeout(self.timeout, inference)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))?
    }
}

/// Builds the process-wide embedder for the configured remote service.
/// Nothing is contacted until the first `embed` call.
pub fn build_embedder(config: &EmbeddingConfig) -> Arc<LazyEmbedder> {
    let loader = Arc::new(remote::RemoteModelLoader::new(config.clone()));
    Arc::new(LazyEmbedder::new(
        loader,
        config.timeout,
        config.concurrent_inference,
    ))
}

/// Cosine similarity in [-1, 1]. A zero-norm vector has similarity 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::testing::*;
    use super::*;

    /// Records how many `embed` calls are in flight at once.
    struct ConcurrencyProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Embedder for ConcurrencyProbe {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    struct ProbeLoader(Arc<ConcurrencyProbe>);

    #[async_trait]
    impl ModelLoader for ProbeLoader {
        async fn load(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
            Ok(self.0.clone())
        }
    }

    fn probe() -> Arc<ConcurrencyProbe> {
        Arc::new(ConcurrencyProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        })
    }

    #[test]
    fn test_cosine_identical_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_opposite_vectors_is_negative_one() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch_errors() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_first_calls_share_one_load() {
        let loader = Arc::new(CountingLoader::new(0, Duration::from_millis(200)));
        let embedder = LazyEmbedder::new(loader.clone(), Duration::from_secs(5), true);
        assert!(!embedder.is_loaded());

        let (a, b, c) = tokio::join!(
            embedder.embed(&["a"]),
            embedder.embed(&["b"]),
            embedder.embed(&["c"]),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(embedder.is_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_is_retried_on_next_call() {
        let loader = Arc::new(CountingLoader::new(1, Duration::from_millis(10)));
        let embedder = LazyEmbedder::new(loader.clone(), Duration::from_secs(5), true);

        let first = embedder.embed(&["a"]).await;
        assert!(matches!(first, Err(EmbeddingError::Load(_))));
        assert!(!embedder.is_loaded());

        let second = embedder.embed(&["a"]).await;
        assert!(second.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_inference_times_out() {
        let slow = Arc::new(ConcurrencyProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_secs(3600),
        });
        let embedder = LazyEmbedder::new(
            Arc::new(ProbeLoader(slow)),
            Duration::from_secs(1),
            true,
        );

        let err = embedder.embed(&["a", "b"]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_slot_serializes_inference() {
        let model = probe();
        let embedder = LazyEmbedder::new(
            Arc::new(ProbeLoader(model.clone())),
            Duration::from_secs(5),
            false,
        );

        let _ = tokio::join!(
            embedder.embed(&["a"]),
            embedder.embed(&["b"]),
            embedder.embed(&["c"]),
            embedder.embed(&["d"]),
        );
        assert_eq!(model.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_inference_is_not_serialized() {
        let model = probe();
        let embedder = LazyEmbedder::new(
            Arc::new(ProbeLoader(model.clone())),
            Duration::from_secs(5),
            true,
        );

        let _ = tokio::join!(
            embedder.embed(&["a"]),
            embedder.embed(&["b"]),
            embedder.embed(&["c"]),
        );
        assert_eq!(model.peak.load(Ordering::SeqCst), 3);
    }
}
