//! HTTP adapters for the matching engine's external collaborators.
//!
//! - `openai` / `ollama` implement the embedding port against hosted and
//!   local embedding endpoints.
//! - `fynd` implements the catalog port and maps the loosely typed catalog
//!   payload into a strict `ProductDescriptor` at the boundary.
//! - `factory` builds the configured providers from `AppConfig` sections.
//!
//! Every adapter issues exactly one request per call, enforces the configured
//! timeout and never retries.

pub mod factory;
pub mod fynd;
mod http;
pub mod ollama;
pub mod openai;

pub use factory::{catalog_provider, embedding_provider};
pub use fynd::FyndCatalogClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;
