use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const DEFAULT_BRAND: &str = "Generic";
pub const DEFAULT_CATEGORY: &str = "Others";
pub const DEFAULT_DEPARTMENT: &str = "Others";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductSlug(pub String);

impl ProductSlug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only projection of a catalog item, already default-filled at the
/// catalog boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDescriptor {
    pub slug: ProductSlug,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub department: String,
    pub effective_price: f64,
    pub discount_pct: f64,
    pub currency_symbol: String,
    pub description: String,
    pub sizes: Vec<String>,
}

impl ProductDescriptor {
    /// Starts a descriptor with neutral defaults for every optional field.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: ProductSlug(slug.into()),
            name: name.into(),
            brand: DEFAULT_BRAND.to_owned(),
            category: DEFAULT_CATEGORY.to_owned(),
            department: DEFAULT_DEPARTMENT.to_owned(),
            effective_price: 0.0,
            discount_pct: 0.0,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
            description: String::new(),
            sizes: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.slug.0.trim().is_empty() {
            return Err(DomainError::MissingField("slug".to_owned()));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::MissingField("name".to_owned()));
        }
        if !self.effective_price.is_finite() || !self.discount_pct.is_finite() {
            return Err(DomainError::InvariantViolation(format!(
                "product `{}` has a non-finite price or discount",
                self.slug
            )));
        }
        Ok(())
    }
}
