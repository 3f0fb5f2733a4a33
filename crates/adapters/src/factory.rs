use std::sync::Arc;

use secrecy::SecretString;
use tracing::info;

use tastematch_core::catalog::CatalogProvider;
use tastematch_core::config::{
    CatalogConfig, EmbeddingConfig, EmbeddingProviderKind, DEFAULT_OPENAI_BASE_URL,
};
use tastematch_core::embedding::{CachedEmbeddingProvider, EmbeddingProvider};
use tastematch_core::errors::ApplicationError;

use crate::fynd::FyndCatalogClient;
use crate::ollama::OllamaEmbeddingClient;
use crate::openai::OpenAiEmbeddingClient;

/// Builds the embedding provider selected by `config.provider`, wrapped in the
/// in-process cache when `cache_enabled` is set.
pub fn embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, ApplicationError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ApplicationError::Configuration(
                    "embedding.api_key is required for the openai provider".to_string(),
                )
            })?;
            let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL);
            Arc::new(OpenAiEmbeddingClient::new(
                base_url,
                api_key,
                config.model.as_str(),
                config.timeout_secs,
            )?)
        }
        EmbeddingProviderKind::Ollama => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                ApplicationError::Configuration(
                    "embedding.base_url is required for the ollama provider".to_string(),
                )
            })?;
            Arc::new(OllamaEmbeddingClient::new(
                base_url,
                config.model.as_str(),
                config.timeout_secs,
            )?)
        }
    };

    info!(
        event_name = "embedding.provider.configured",
        provider = config.provider.as_str(),
        model = %config.model,
        cached = config.cache_enabled,
    );

    if config.cache_enabled {
        Ok(Arc::new(CachedEmbeddingProvider::new(provider)))
    } else {
        Ok(provider)
    }
}

/// Builds the catalog client, or `None` when no catalog is configured.
pub fn catalog_provider(
    config: &CatalogConfig,
) -> Result<Option<Arc<dyn CatalogProvider>>, ApplicationError> {
    if !config.is_configured() {
        return Ok(None);
    }
    let base_url = config.base_url.as_deref().unwrap_or_default();
    let application_id = config.application_id.clone().ok_or_else(|| {
        ApplicationError::Configuration("catalog.application_id is required".to_string())
    })?;
    let application_token: SecretString = config.application_token.clone().ok_or_else(|| {
        ApplicationError::Configuration("catalog.application_token is required".to_string())
    })?;

    let client =
        FyndCatalogClient::new(base_url, application_id, application_token, config.timeout_secs)?;
    info!(event_name = "catalog.provider.configured", base_url = %base_url);
    Ok(Some(Arc::new(client)))
}
