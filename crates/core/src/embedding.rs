//! Embedding port: text in, fixed-dimension vector out.
//!
//! The model behind a provider is opaque. Providers perform exactly one
//! outbound call per `embed` and never retry; retry policy belongs to the
//! caller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{ApplicationError, DomainError};
use crate::similarity::ensure_finite;

pub type EmbeddingVector = Vec<f32>;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding input text must not be empty")]
    EmptyInput,
    #[error("embedding generation failed: {0}")]
    Generation(String),
    #[error("embedding generation failed: no response within {0}s")]
    Timeout(u64),
}

impl From<EmbeddingError> for ApplicationError {
    fn from(value: EmbeddingError) -> Self {
        match value {
            EmbeddingError::EmptyInput => Self::Domain(DomainError::EmptyEmbeddingInput),
            other => Self::Integration(other.to_string()),
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model producing the vectors. Vectors are only
    /// comparable when they come from the same model.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;
}

/// Validates the input, delegates to the provider and lifts the failure into
/// the application taxonomy.
pub async fn embed_text(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<EmbeddingVector, ApplicationError> {
    if text.trim().is_empty() {
        return Err(DomainError::EmptyEmbeddingInput.into());
    }

    let vector = provider.embed(text).await?;
    if vector.is_empty() {
        return Err(ApplicationError::Integration(
            "embedding generation failed: provider returned an empty vector".to_owned(),
        ));
    }
    if let Err(error) = ensure_finite(&vector) {
        return Err(ApplicationError::Integration(format!("embedding generation failed: {error}")));
    }

    debug!(
        event_name = "embedding.generated",
        model = provider.model(),
        dimensions = vector.len(),
        "embedding generated"
    );
    Ok(vector)
}

/// Content-addressed cache in front of another provider.
///
/// Entries are keyed by a blake3 digest of model and text and are never
/// mutated after insertion, so unchanged text always maps to the vector first
/// produced for it.
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    entries: RwLock<HashMap<[u8; 32], EmbeddingVector>>,
}

impl CachedEmbeddingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self { inner, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn cache_key(&self, text: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.inner.model().as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let key = self.cache_key(text);
        if let Some(hit) = self.entries.read().await.get(&key) {
            return Ok(hit.clone());
        }

        let vector = self.inner.embed(text).await?;
        let mut entries = self.entries.write().await;
        Ok(entries.entry(key).or_insert(vector).clone())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fakes::{FixedEmbedder, LetterCountEmbedder};
    use super::{embed_text, CachedEmbeddingProvider, EmbeddingProvider};
    use crate::errors::{ApplicationError, DomainError};
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_call() {
        let provider = LetterCountEmbedder::default();
        let result = embed_text(&provider, "   ").await;

        assert_eq!(result, Err(ApplicationError::Domain(DomainError::EmptyEmbeddingInput)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_integration_error() {
        let provider = LetterCountEmbedder::failing();
        let result = embed_text(&provider, "linen shirt").await;

        match result {
            Err(ApplicationError::Integration(message)) => {
                assert!(message.starts_with("embedding generation failed"));
            }
            other => panic!("expected integration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_finite_provider_output_is_an_integration_error() {
        let provider = FixedEmbedder(vec![0.5, f32::INFINITY, 0.1]);
        let result = embed_text(&provider, "linen shirt").await;

        match result {
            Err(ApplicationError::Integration(message)) => {
                assert_eq!(
                    message,
                    "embedding generation failed: embedding component 1 is not a finite number"
                );
            }
            other => panic!("expected integration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn uncached_provider_calls_every_time() {
        let provider = LetterCountEmbedder::default();
        embed_text(&provider, "same text").await.expect("first");
        embed_text(&provider, "same text").await.expect("second");

        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn cache_serves_identical_text_once() {
        let inner = Arc::new(LetterCountEmbedder::default());
        let cached = CachedEmbeddingProvider::new(inner.clone());

        let first = cached.embed("linen shirt").await.expect("first");
        let second = cached.embed("linen shirt").await.expect("second");
        let other = cached.embed("denim jacket").await.expect("other");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(inner.call_count(), 2);
        assert_eq!(cached.len().await, 2);
        assert_eq!(cached.model(), "letter-count");
    }

    #[tokio::test]
    async fn embedded_text_is_self_similar() {
        let provider = LetterCountEmbedder::default();
        let vector = embed_text(&provider, "User prefers categories: Shirts.").await.expect("embed");
        let score = cosine_similarity(&vector, &vector).expect("score");

        assert!((score - 1.0).abs() < 1e-9);
    }
}
