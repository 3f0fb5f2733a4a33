//! Product-to-user matching
//!
//! Scores a product's embedding against every stored preference embedding,
//! drops users who disliked the product or fall below the threshold, and
//! tiers the rest by whether they liked the product before.

mod evaluator;
mod service;
mod types;

pub use evaluator::MatchEvaluator;
pub use service::ProductMatcher;
pub use types::*;

/// Minimum cosine similarity for a user to be reported.
pub const DEFAULT_THRESHOLD: f64 = 0.7;
