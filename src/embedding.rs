//! Embedding client for the external embedding API
//!
//! Converts text into fixed-dimension vectors, batching requests and pacing
//! consecutive batches to respect upstream rate limits. Output order must
//! match input order: vectors are placed by the index the API returns, and
//! a count mismatch is a hard error rather than a silent mis-attribution.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::errors::{PipelineError, Result};

/// Default embedding API endpoint
pub const DEFAULT_EMBEDDING_URL: &str = "https://api.voyageai.com/v1/embeddings";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "voyage-3-large";

/// Vector dimensionality; must match the configured vector index
pub const EMBEDDING_DIM: usize = 1024;

/// Texts per API call
pub const EMBED_BATCH_SIZE: usize = 128;

/// Request timeout (30 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-to-vector capability, injected into the retriever and indexer so
/// tests can substitute a fake.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a list of texts, preserving input order in the output.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(PipelineError::EmbeddingMismatch {
            sent: 1,
            received: 0,
        })
    }

    /// Vector dimensionality produced by this embedder
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// HTTP embedding client
#[derive(Debug, Clone)]
pub struct VoyageClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
    /// Pause between consecutive batches; zero in tests
    batch_delay: Duration,
}

impl VoyageClient {
    /// Create a client with default endpoint and model.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_config(
            DEFAULT_EMBEDDING_URL,
            DEFAULT_EMBEDDING_MODEL,
            api_key,
            EMBED_BATCH_SIZE,
            Duration::from_millis(200),
        )
    }

    /// Create a client with custom configuration.
    pub fn with_config(
        base_url: &str,
        model: &str,
        api_key: &str,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            batch_size: batch_size.max(1),
            batch_delay,
        })
    }

    async fn call_api(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            input: inputs,
            model: &self.model,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PipelineError::EmbeddingApi { status, message });
        }

        let body: EmbeddingResponse = response.json().await?;
        order_embeddings(body, inputs.len())
    }
}

#[async_trait]
impl Embedder for VoyageClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(texts.len());
        let batch_count = texts.len().div_ceil(self.batch_size);

        for (batch_idx, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = batch_idx + 1, of = batch_count, size = batch.len(), "embedding batch");
            results.extend(self.call_api(batch).await?);

            // Pace consecutive batches; the last one needs no pause
            if batch_idx + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        Ok(results)
    }
}

/// Place response vectors by their returned index so the positional mapping
/// back to the request batch is exact.
fn order_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(PipelineError::EmbeddingMismatch {
            sent: expected,
            received: response.data.len(),
        });
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response.data {
        if item.index >= expected || slots[item.index].is_some() {
            return Err(PipelineError::EmbeddingMismatch {
                sent: expected,
                received: 0,
            });
        }
        slots[item.index] = Some(item.embedding);
    }

    // All slots filled: counts matched and indices were unique and in range
    Ok(slots.into_iter().map(|s| s.unwrap()).collect())
}
