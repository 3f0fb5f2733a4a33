use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use tastematch_core::domain::preference::{PreferenceWrite, StoredPreference, UserId};
use tastematch_core::errors::ApplicationError;
use tastematch_core::persistence::PreferenceStore;

use super::RepositoryError;

/// Map-backed preference store with the same upsert semantics as the SQL
/// repository.
#[derive(Default)]
pub struct InMemoryPreferenceRepository {
    records: RwLock<BTreeMap<String, StoredPreference>>,
}

impl InMemoryPreferenceRepository {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceRepository {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredPreference>, ApplicationError> {
        let records = self.records.read().await;
        Ok(records.get(user_id.as_str()).cloned())
    }

    async fn insert(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        if let Some(current) = records.get_mut(write.user_id.as_str()) {
            current.preferences = write.preferences;
            current.embedding = Some(write.embedding);
            current.text_summary = write.text_summary;
            current.updated_at = now;
            return Ok(current.clone());
        }

        let stored = StoredPreference {
            id: Uuid::new_v4().to_string(),
            user_id: write.user_id,
            preferences: write.preferences,
            embedding: Some(write.embedding),
            text_summary: write.text_summary,
            created_at: now,
            updated_at: now,
        };
        records.insert(stored.user_id.as_str().to_owned(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError> {
        let mut records = self.records.write().await;
        let Some(current) = records.get_mut(write.user_id.as_str()) else {
            return Err(RepositoryError::NotFound(write.user_id.to_string()).into());
        };

        current.preferences = write.preferences;
        current.embedding = Some(write.embedding);
        current.text_summary = write.text_summary;
        current.updated_at = Utc::now();
        Ok(current.clone())
    }

    async fn list_with_embedding(&self) -> Result<Vec<StoredPreference>, ApplicationError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|record| record.embedding.is_some()).cloned().collect())
    }
}
