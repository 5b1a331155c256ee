use crate::error::{Result, VecgraphError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// Request structure for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response structure from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client.
///
/// One text in, one fixed-dimension vector out. The call is treated as an
/// opaque, possibly slow remote operation: timeout-bounded, no internal
/// retries (retry/backoff is the caller's concern), and every failure maps
/// to `EmbeddingUnavailable`.
pub struct OpenAIEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new embedder.
    ///
    /// `dimensions` is the deployment-wide embedding dimension D; responses
    /// of any other length are rejected.
    pub fn new(
        api_key: String,
        model: String,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VecgraphError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model,
            dimensions,
        })
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The embedding dimension this client was configured for.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = std::time::Instant::now();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| VecgraphError::EmbeddingUnavailable(format!("Network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(VecgraphError::EmbeddingUnavailable(format!(
                "Embedding API error {status}: {body}"
            )));
        }

        let result: EmbeddingResponse = response.json().await.map_err(|e| {
            VecgraphError::EmbeddingUnavailable(format!("Failed to parse response: {e}"))
        })?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                VecgraphError::EmbeddingUnavailable("Empty response from embedding API".to_string())
            })?;

        if embedding.len() != self.dimensions {
            return Err(VecgraphError::EmbeddingUnavailable(format!(
                "Unexpected embedding dimension: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        log::debug!("Embedding API call took {:?}", start.elapsed());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_new() {
        let embedder = OpenAIEmbedder::new(
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            1536,
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(embedder.model, "text-embedding-3-small");
        assert_eq!(embedder.dimensions(), 1536);
        assert_eq!(embedder.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_embedder_custom_endpoint() {
        let embedder = OpenAIEmbedder::new(
            "test-key".to_string(),
            "nomic-embed-text".to_string(),
            768,
            Duration::from_secs(5),
        )
        .unwrap()
        .with_endpoint("http://localhost:11434/v1/embeddings");

        assert_eq!(embedder.endpoint, "http://localhost:11434/v1/embeddings");
    }

    // Note: Integration tests for actual API calls would require a real API key
    // and should be run separately with proper test fixtures
}
