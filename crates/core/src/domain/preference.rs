use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::signals::{EnhancedSignals, ProductInteraction};
use crate::embedding::EmbeddingVector;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// A user's declared and observed taste. Replaced wholesale on every
/// submission, never merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    #[serde(default)]
    pub selected_categories: Vec<String>,
    #[serde(default)]
    pub liked_products: Vec<String>,
    #[serde(default)]
    pub disliked_products: Vec<String>,
    pub price_range: PriceRange,
    #[serde(default)]
    pub selected_brands: Vec<String>,
    #[serde(default, rename = "enhancedData", skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<EnhancedSignals>,
}

impl PreferenceRecord {
    pub fn new(price_range: PriceRange) -> Self {
        Self {
            selected_categories: Vec::new(),
            liked_products: Vec::new(),
            disliked_products: Vec::new(),
            price_range,
            selected_brands: Vec::new(),
            enhanced: None,
        }
    }

    /// Builds a record from swipe history; identifier order follows the
    /// interaction order and signals are derived once here.
    pub fn from_interactions(
        selected_categories: Vec<String>,
        selected_brands: Vec<String>,
        price_range: PriceRange,
        liked: Vec<ProductInteraction>,
        disliked: Vec<ProductInteraction>,
    ) -> Self {
        let liked_products = liked.iter().map(|item| item.slug.clone()).collect();
        let disliked_products = disliked.iter().map(|item| item.slug.clone()).collect();

        Self {
            selected_categories,
            liked_products,
            disliked_products,
            price_range,
            selected_brands,
            enhanced: Some(EnhancedSignals::derive(liked, disliked)),
        }
    }

    pub fn has_liked(&self, slug: &str) -> bool {
        self.liked_products.iter().any(|liked| liked == slug)
    }

    pub fn has_disliked(&self, slug: &str) -> bool {
        self.disliked_products.iter().any(|disliked| disliked == slug)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let liked: HashSet<&str> = self.liked_products.iter().map(String::as_str).collect();
        if let Some(overlap) = self.disliked_products.iter().find(|slug| liked.contains(slug.as_str()))
        {
            return Err(DomainError::InvariantViolation(format!(
                "product `{overlap}` is both liked and disliked"
            )));
        }

        let range = &self.price_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
            return Err(DomainError::InvariantViolation(format!(
                "price range {}-{} is not a valid interval",
                range.min, range.max
            )));
        }

        Ok(())
    }
}

/// The persisted form of a preference record, as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredPreference {
    pub id: String,
    pub user_id: UserId,
    pub preferences: PreferenceRecord,
    pub embedding: Option<EmbeddingVector>,
    pub text_summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write payload handed to the store; identifiers and timestamps are
/// assigned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct PreferenceWrite {
    pub user_id: UserId,
    pub preferences: PreferenceRecord,
    pub embedding: EmbeddingVector,
    pub text_summary: String,
}

#[cfg(test)]
mod tests {
    use super::{PreferenceRecord, PriceRange};
    use crate::domain::signals::fixtures::interaction;
    use crate::domain::signals::InteractionKind;
    use crate::errors::DomainError;

    fn range() -> PriceRange {
        PriceRange { min: 500.0, max: 5000.0, currency: "INR".to_owned() }
    }

    #[test]
    fn overlapping_like_and_dislike_is_rejected() {
        let mut record = PreferenceRecord::new(range());
        record.liked_products = vec!["a".to_owned(), "b".to_owned()];
        record.disliked_products = vec!["b".to_owned()];

        assert!(matches!(record.validate(), Err(DomainError::InvariantViolation(ref m)) if m.contains("`b`")));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let record = PreferenceRecord::new(PriceRange {
            min: 900.0,
            max: 100.0,
            currency: "INR".to_owned(),
        });
        assert!(record.validate().is_err());
    }

    #[test]
    fn from_interactions_keeps_swipe_order() {
        let record = PreferenceRecord::from_interactions(
            vec!["Shirts".to_owned()],
            Vec::new(),
            range(),
            vec![
                interaction("z-shirt", "Roadster", "Shirts", 900.0, 0.0, InteractionKind::Like),
                interaction("a-shirt", "Roadster", "Shirts", 950.0, 0.0, InteractionKind::Like),
            ],
            vec![interaction("m-jeans", "Levis", "Jeans", 1900.0, 0.0, InteractionKind::Dislike)],
        );

        assert_eq!(record.liked_products, vec!["z-shirt", "a-shirt"]);
        assert_eq!(record.disliked_products, vec!["m-jeans"]);
        assert!(record.has_liked("a-shirt"));
        assert!(record.has_disliked("m-jeans"));
        assert!(record.enhanced.is_some());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn serialized_shape_uses_camel_case_keys() {
        let record = PreferenceRecord::new(range());
        let value = serde_json::to_value(&record).unwrap_or_default();

        assert!(value.get("selectedCategories").is_some());
        assert!(value.get("priceRange").is_some());
        assert!(value.get("enhancedData").is_none());
    }
}
