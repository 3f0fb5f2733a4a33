//! Preference persistence: the record store port and the coordinator that
//! synthesizes, embeds and upserts a user's preferences.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::descriptor::describe_preferences;
use crate::domain::preference::{PreferenceRecord, PreferenceWrite, StoredPreference, UserId};
use crate::embedding::{embed_text, EmbeddingProvider};
use crate::errors::{ApplicationError, DomainError};

/// External record store, keyed uniquely by user id.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredPreference>, ApplicationError>;

    /// Creates the user's record. If one appeared after the caller's lookup,
    /// it is replaced in place instead of failing.
    async fn insert(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError>;

    /// Replaces the record of an existing user. Keeps id and `created_at`.
    async fn update(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError>;

    /// Population source for matching. Users without an embedding are
    /// excluded.
    async fn list_with_embedding(&self) -> Result<Vec<StoredPreference>, ApplicationError>;
}

pub struct PreferenceCoordinator {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceCoordinator {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn PreferenceStore>) -> Self {
        Self { embedder, store }
    }

    /// Persists `record` as the sole preference record of `user_id`.
    ///
    /// The embedding is generated before the store is touched; if it fails
    /// nothing is written.
    pub async fn persist(
        &self,
        user_id: &UserId,
        record: PreferenceRecord,
    ) -> Result<StoredPreference, ApplicationError> {
        if user_id.as_str().trim().is_empty() {
            return Err(DomainError::MissingField("user_id".to_owned()).into());
        }
        record.validate()?;

        let text_summary = describe_preferences(&record);
        debug!(
            event_name = "preferences.persist.synthesized",
            user_id = %user_id,
            text_summary = %text_summary,
            "preference text synthesized"
        );

        let embedding = embed_text(self.embedder.as_ref(), &text_summary).await?;
        debug!(
            event_name = "preferences.persist.embedded",
            user_id = %user_id,
            dimensions = embedding.len(),
            "preference embedding generated"
        );

        let write = PreferenceWrite {
            user_id: user_id.clone(),
            preferences: record,
            embedding,
            text_summary,
        };

        let existing = self.store.find_by_user(user_id).await?;
        let (stored, action) = match existing {
            Some(_) => (self.store.update(write).await?, "updated"),
            None => (self.store.insert(write).await?, "inserted"),
        };

        info!(
            event_name = "preferences.persist.completed",
            user_id = %user_id,
            record_id = %stored.id,
            action,
            "preferences persisted"
        );
        Ok(stored)
    }
}
