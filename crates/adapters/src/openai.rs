use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tastematch_core::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use tastematch_core::errors::ApplicationError;

use crate::http::{build_client, describe_failure, embedding_transport_error, join_url};

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbeddingClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: EmbeddingVector,
}

impl OpenAiEmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ApplicationError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            timeout_secs,
        })
    }
}

impl std::fmt::Debug for OpenAiEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(join_url(&self.base_url, "embeddings"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest { model: &self.model, input: text, encoding_format: "float" })
            .send()
            .await
            .map_err(|error| embedding_transport_error(error, self.timeout_secs))?;

        if !response.status().is_success() {
            let description = describe_failure(response).await;
            warn!(event_name = "embedding.openai.rejected", model = %self.model, %description);
            return Err(EmbeddingError::Generation(description));
        }

        let payload: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingError::Generation(format!("failed to decode embedding response: {error}"))
        })?;

        payload
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| EmbeddingError::Generation("response contained no embedding".to_string()))
    }
}
