/// Remote embedding client — talks to an OpenAI-compatible `/v1/embeddings`
/// endpoint (text-embeddings-inference, Ollama, vLLM, hosted APIs).
///
/// All embedding traffic goes through `RemoteEmbeddingModel`; the pipeline
/// only sees the `Embedder` trait.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embeddings::{Embedder, EmbeddingError, ModelLoader};

const EMBEDDINGS_PATH: &str = "/v1/embeddings";
const MAX_RETRIES: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Model loads on the serving side can take much longer than inference.
const WARMUP_TIMEOUT: Duration = Duration::from_secs(300);
const WARMUP_TEXT: &str = "warmup";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct RemoteEmbeddingModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    /// Vector length observed at load time; later responses must match.
    dimension: Option<usize>,
}

impl RemoteEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: embeddings_endpoint(&config.api_url),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: None,
        })
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn request(
        &self,
        texts: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, body);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            let text = response.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<ApiError>(&text)
                    .map(|e| e.error.message)
                    .unwrap_or(text);
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let vectors = parse_embedding_response(&text, texts.len(), self.dimension)?;
            debug!(
                count = vectors.len(),
                dimension = vectors.first().map(Vec::len).unwrap_or(0),
                "Embedding call succeeded"
            );
            return Ok(vectors);
        }

        Err(last_error.unwrap_or(EmbeddingError::Unavailable {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl Embedder for RemoteEmbeddingModel {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts, None).await
    }
}

/// One-time "model load": a warm-up embedding that forces the serving side to
/// load its weights and pins the vector dimension.
pub struct RemoteModelLoader {
    config: EmbeddingConfig,
}

impl RemoteModelLoader {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    async fn load(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        let mut model = RemoteEmbeddingModel::new(&self.config)?;

        let warmup = model
            .request(&[WARMUP_TEXT], Some(WARMUP_TIMEOUT))
            .await
            .map_err(|e| EmbeddingError::Load(format!("{} warm-up failed: {e}", self.config.model)))?;

        let dimension = warmup.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbeddingError::Load(format!(
                "{} returned an empty warm-up vector",
                self.config.model
            )));
        }
        model.dimension = Some(dimension);

        tracing::info!(
            model = %self.config.model,
            endpoint = %model.endpoint,
            dimension,
            "Remote embedding model loaded"
        );
        Ok(Arc::new(model))
    }
}

fn embeddings_endpoint(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if base.ends_with(EMBEDDINGS_PATH) {
        base.to_string()
    } else {
        format!("{base}{EMBEDDINGS_PATH}")
    }
}

/// Parses an embeddings response body, restoring input order by `index` and
/// checking count and dimension.
fn parse_embedding_response(
    body: &str,
    expected_count: usize,
    expected_dimension: Option<usize>,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

    if parsed.data.len() != expected_count {
        return Err(EmbeddingError::Malformed(format!(
            "expected {expected_count} embeddings, got {}",
            parsed.data.len()
        )));
    }

    parsed.data.sort_by_key(|item| item.index);

    let mut vectors = Vec::with_capacity(expected_count);
    for (position, item) in parsed.data.into_iter().enumerate() {
        if item.index != position {
            return Err(EmbeddingError::Malformed(format!(
                "embedding index {} out of range",
                item.index
            )));
        }
        if let Some(expected) = expected_dimension {
            if item.embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: item.embedding.len(),
                });
            }
        }
        vectors.push(item.embedding);
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_path() {
        assert_eq!(
            embeddings_endpoint("http://localhost:8001/"),
            "http://localhost:8001/v1/embeddings"
        );
    }

    #[test]
    fn test_endpoint_keeps_full_path() {
        assert_eq!(
            embeddings_endpoint("https://api.example.com/v1/embeddings"),
            "https://api.example.com/v1/embeddings"
        );
    }

    #[test]
    fn test_parse_restores_input_order() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let vectors = parse_embedding_response(body, 2, Some(2)).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_rejects_wrong_count() {
        let body = r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#;
        let err = parse_embedding_response(body, 2, None).unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }

    #[test]
    fn test_parse_rejects_dimension_drift() {
        let body = r#"{"data": [
            {"index": 0, "embedding": [1.0, 0.0, 0.0]},
            {"index": 1, "embedding": [1.0, 0.0]}
        ]}"#;
        let err = parse_embedding_response(body, 2, Some(3)).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_indices() {
        let body = r#"{"data": [
            {"index": 0, "embedding": [1.0]},
            {"index": 0, "embedding": [1.0]}
        ]}"#;
        assert!(parse_embedding_response(body, 2, None).is_err());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_embedding_response("<html>bad gateway</html>", 1, None).unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let input = ["resume text", "jd text"];
        let body = EmbeddingRequest {
            model: "all-MiniLM-L6-v2",
            input: &input,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "all-MiniLM-L6-v2");
        assert_eq!(json["input"][1], "jd text");
    }
}
