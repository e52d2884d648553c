//! Embedding client: the single point of entry for all embedding-backend
//! calls in the engine.
//!
//! ARCHITECTURAL RULE: no other module may call the embedding API directly.
//! Dedup decisions consume vectors through [`SimilarityIndex`]; the backend
//! is injected as an `Arc<dyn EmbeddingBackend>` so tests substitute
//! deterministic vectors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod index;

pub use index::{l2_normalize, nearest, normalize_text, SimilarityIndex, SimilarityMatch};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backend unavailable after {retries} retries")]
    Unavailable { retries: u32 },

    #[error("Backend returned {got} vectors for {expected} inputs")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Turns free text into fixed-length vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order. Inputs are already normalized and non-empty by the time they reach
/// the backend; an unreachable backend surfaces `Unavailable`, which callers
/// treat as "cannot determine duplication" and degrade to exact-text
/// comparison.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
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

/// HTTP embedding backend.
/// Retries rate limits, server errors, and transport failures with
/// exponential backoff before surfacing `Unavailable`.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpEmbeddingClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
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

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: EmbeddingResponse = response.json().await.map_err(EmbeddingError::Http)?;

            if parsed.data.len() != texts.len() {
                return Err(EmbeddingError::ShapeMismatch {
                    expected: texts.len(),
                    got: parsed.data.len(),
                });
            }

            let mut items = parsed.data;
            items.sort_by_key(|item| item.index);
            let vectors: Vec<Vec<f32>> = items.into_iter().map(|item| item.embedding).collect();

            debug!("Embedded {} texts", vectors.len());
            return Ok(vectors);
        }

        if let Some(err) = last_error {
            warn!("Embedding backend unreachable: {err}");
        }
        Err(EmbeddingError::Unavailable {
            retries: MAX_RETRIES,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_response_parses_out_of_order_items() {
        let raw = r#"{
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }"#;
        let mut parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        parsed.data.sort_by_key(|item| item.index);
        assert_eq!(parsed.data[0].embedding, vec![1.0, 0.0]);
        assert_eq!(parsed.data[1].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_stub_embedder_is_deterministic() {
        use testing::StubEmbedder;

        let stub = StubEmbedder::new();
        let texts = vec!["rust".to_string(), "rust".to_string(), "go".to_string()];
        let vectors = stub.embed(&texts).await.unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_ne!(vectors[0], vectors[2]);
    }
}
