use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tastematch_core::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use tastematch_core::errors::ApplicationError;

use crate::http::{build_client, describe_failure, embedding_transport_error, join_url};

/// Client for a local Ollama server's `/api/embeddings` endpoint.
#[derive(Debug)]
pub struct OllamaEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: EmbeddingVector,
}

impl OllamaEmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ApplicationError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(join_url(&self.base_url, "api/embeddings"))
            .json(&EmbeddingRequest { model: &self.model, prompt: text })
            .send()
            .await
            .map_err(|error| embedding_transport_error(error, self.timeout_secs))?;

        if !response.status().is_success() {
            let description = describe_failure(response).await;
            warn!(event_name = "embedding.ollama.rejected", model = %self.model, %description);
            return Err(EmbeddingError::Generation(description));
        }

        let payload: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingError::Generation(format!("failed to decode embedding response: {error}"))
        })?;
        if payload.embedding.is_empty() {
            return Err(EmbeddingError::Generation("response contained no embedding".to_string()));
        }
        Ok(payload.embedding)
    }
}
