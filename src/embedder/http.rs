//! HTTP embedder speaking the Ollama embeddings API.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbedderError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama-compatible `/api/embeddings` endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: impl Into<String>, dimensions: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedderError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbedderError::InferenceFailed(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InferenceFailed(e.to_string()))?;

        if body.embedding.len() != self.dimensions {
            return Err(EmbedderError::DimensionMismatch {
                got: body.embedding.len(),
                expected: self.dimensions,
            });
        }
        Ok(body.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
