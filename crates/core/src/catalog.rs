use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::product::{ProductDescriptor, ProductSlug};
use crate::errors::ApplicationError;

/// Read-only view of the external product catalog.
///
/// An unknown slug is `Ok(None)`. Transport or payload failures are
/// [`ApplicationError::Integration`].
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn product_by_slug(
        &self,
        slug: &ProductSlug,
    ) -> Result<Option<ProductDescriptor>, ApplicationError>;
}

/// Catalog backed by a map. Used for tests and offline runs.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, ProductDescriptor>>,
}

impl InMemoryCatalog {
    pub fn with_products(products: impl IntoIterator<Item = ProductDescriptor>) -> Self {
        let products =
            products.into_iter().map(|product| (product.slug.as_str().to_owned(), product)).collect();
        Self { products: RwLock::new(products) }
    }

    pub async fn insert(&self, product: ProductDescriptor) {
        self.products.write().await.insert(product.slug.as_str().to_owned(), product);
    }
}

impl fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCatalog").finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn product_by_slug(
        &self,
        slug: &ProductSlug,
    ) -> Result<Option<ProductDescriptor>, ApplicationError> {
        Ok(self.products.read().await.get(slug.as_str()).cloned())
    }
}
