pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod domain;
pub mod embedding;
pub mod errors;
pub mod matching;
pub mod persistence;
pub mod similarity;

pub use catalog::{CatalogProvider, InMemoryCatalog};
pub use descriptor::{describe_preferences, describe_product};
pub use domain::preference::{
    PreferenceRecord, PreferenceWrite, PriceRange, StoredPreference, UserId,
};
pub use domain::product::{ProductDescriptor, ProductSlug};
pub use domain::signals::{EnhancedSignals, InteractionKind, ProductInteraction};
pub use embedding::{
    embed_text, CachedEmbeddingProvider, EmbeddingError, EmbeddingProvider, EmbeddingVector,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use matching::{
    Candidate, MatchEvaluator, MatchReport, MatchResult, MatchTier, ProductEmbedding,
    ProductMatcher,
};
pub use persistence::{PreferenceCoordinator, PreferenceStore};
pub use similarity::cosine_similarity;
