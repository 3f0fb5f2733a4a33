//! Types for the match evaluator

use serde::{Deserialize, Serialize};

use crate::domain::preference::{PreferenceRecord, StoredPreference, UserId};
use crate::domain::product::ProductDescriptor;
use crate::embedding::EmbeddingVector;

/// Quality tier of a match. Driven only by prior-liked status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Good,
}

impl MatchTier {
    pub fn for_prior_like(previously_liked: bool) -> Self {
        if previously_liked {
            Self::Excellent
        } else {
            Self::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
        }
    }
}

/// One member of the scanned population.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub user_id: UserId,
    pub preferences: PreferenceRecord,
    /// `None` until the user has generated a preference embedding.
    pub embedding: Option<EmbeddingVector>,
}

impl From<StoredPreference> for Candidate {
    fn from(value: StoredPreference) -> Self {
        Self { user_id: value.user_id, preferences: value.preferences, embedding: value.embedding }
    }
}

/// A user worth notifying about a product. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub user_id: UserId,
    /// Rounded to two decimal places.
    pub similarity: f64,
    pub match_quality: MatchTier,
    pub previously_liked: bool,
    pub user_preferences: PreferenceRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub product: ProductDescriptor,
    pub matches: Vec<MatchResult>,
    pub total_matches: usize,
    pub threshold: f64,
}

/// Product descriptor together with its synthesized text and vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEmbedding {
    pub product: ProductDescriptor,
    pub text_summary: String,
    pub embedding: EmbeddingVector,
}
