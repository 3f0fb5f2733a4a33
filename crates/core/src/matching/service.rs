use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::CatalogProvider;
use crate::descriptor::describe_product;
use crate::domain::product::ProductSlug;
use crate::embedding::{embed_text, EmbeddingProvider};
use crate::errors::ApplicationError;
use crate::persistence::PreferenceStore;

use super::evaluator::MatchEvaluator;
use super::types::{Candidate, MatchReport, ProductEmbedding};

/// Runs a product through catalog lookup, text synthesis, embedding and
/// match evaluation. Holds no mutable state; concurrent calls are
/// independent.
pub struct ProductMatcher {
    catalog: Arc<dyn CatalogProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PreferenceStore>,
}

impl ProductMatcher {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self { catalog, embedder, store }
    }

    pub async fn product_embedding(
        &self,
        slug: &ProductSlug,
    ) -> Result<Option<ProductEmbedding>, ApplicationError> {
        let Some(product) = self.catalog.product_by_slug(slug).await? else {
            debug!(event_name = "matching.product.not_found", slug = %slug, "product not in catalog");
            return Ok(None);
        };
        product.validate()?;

        let text_summary = describe_product(&product)?;
        let embedding = embed_text(self.embedder.as_ref(), &text_summary).await?;
        debug!(
            event_name = "matching.product.embedded",
            slug = %slug,
            text_summary = %text_summary,
            dimensions = embedding.len(),
            "product embedding generated"
        );

        Ok(Some(ProductEmbedding { product, text_summary, embedding }))
    }

    /// Ranks every stored user against the product. `Ok(None)` when the
    /// catalog does not know the slug.
    pub async fn find_matches(
        &self,
        slug: &ProductSlug,
        threshold: f64,
    ) -> Result<Option<MatchReport>, ApplicationError> {
        let evaluator = MatchEvaluator::new(threshold)?;
        let Some(product) = self.product_embedding(slug).await? else {
            return Ok(None);
        };

        let population: Vec<Candidate> =
            self.store.list_with_embedding().await?.into_iter().map(Candidate::from).collect();
        let report = evaluator.evaluate(&product.product, &product.embedding, &population)?;

        info!(
            event_name = "matching.evaluate.completed",
            slug = %slug,
            threshold,
            population = population.len(),
            matches = report.total_matches,
            "match evaluation completed"
        );
        Ok(Some(report))
    }
}
