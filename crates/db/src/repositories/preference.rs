use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use tastematch_core::domain::preference::{
    PreferenceRecord, PreferenceWrite, StoredPreference, UserId,
};
use tastematch_core::embedding::EmbeddingVector;
use tastematch_core::errors::ApplicationError;
use tastematch_core::persistence::PreferenceStore;

use super::RepositoryError;
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, user_id, preferences_json, embedding_json, text_summary,
                                     created_at, updated_at
                              FROM user_preferences";

pub struct SqlPreferenceRepository {
    pool: DbPool,
}

impl SqlPreferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredPreference>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE user_id = ?"))
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_preference).transpose()
    }

    /// Inserts the user's record. A row that appeared for the same user since
    /// the caller's existence check is replaced in place, keeping its id and
    /// `created_at`, so the later writer wins.
    pub async fn insert(&self, write: PreferenceWrite) -> Result<StoredPreference, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(
            "INSERT INTO user_preferences (id, user_id, preferences_json, embedding_json,
                                           text_summary, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE
             SET preferences_json = excluded.preferences_json,
                 embedding_json = excluded.embedding_json,
                 text_summary = excluded.text_summary,
                 updated_at = excluded.updated_at
             RETURNING id, user_id, preferences_json, embedding_json, text_summary,
                       created_at, updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(write.user_id.as_str())
        .bind(encode_preferences(&write.preferences)?)
        .bind(encode_embedding(Some(&write.embedding))?)
        .bind(&write.text_summary)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        let stored = row_to_preference(&row)?;

        debug!(
            event_name = "db.preferences.inserted",
            user_id = %stored.user_id,
            record_id = %stored.id,
            "preference row inserted"
        );
        Ok(stored)
    }

    pub async fn update(&self, write: PreferenceWrite) -> Result<StoredPreference, RepositoryError> {
        let updated_at = Utc::now();
        let row = sqlx::query(
            "UPDATE user_preferences
             SET preferences_json = ?, embedding_json = ?, text_summary = ?, updated_at = ?
             WHERE user_id = ?
             RETURNING id, user_id, preferences_json, embedding_json, text_summary,
                       created_at, updated_at",
        )
        .bind(encode_preferences(&write.preferences)?)
        .bind(encode_embedding(Some(&write.embedding))?)
        .bind(&write.text_summary)
        .bind(updated_at.to_rfc3339())
        .bind(write.user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound(write.user_id.to_string()));
        };
        let stored = row_to_preference(&row)?;

        debug!(
            event_name = "db.preferences.updated",
            user_id = %stored.user_id,
            record_id = %stored.id,
            "preference row updated"
        );
        Ok(stored)
    }

    pub async fn list_with_embedding(&self) -> Result<Vec<StoredPreference>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE embedding_json IS NOT NULL ORDER BY user_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_preference).collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait]
impl PreferenceStore for SqlPreferenceRepository {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredPreference>, ApplicationError> {
        Ok(SqlPreferenceRepository::find_by_user(self, user_id).await?)
    }

    async fn insert(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError> {
        Ok(SqlPreferenceRepository::insert(self, write).await?)
    }

    async fn update(&self, write: PreferenceWrite) -> Result<StoredPreference, ApplicationError> {
        Ok(SqlPreferenceRepository::update(self, write).await?)
    }

    async fn list_with_embedding(&self) -> Result<Vec<StoredPreference>, ApplicationError> {
        Ok(SqlPreferenceRepository::list_with_embedding(self).await?)
    }
}

fn encode_preferences(record: &PreferenceRecord) -> Result<String, RepositoryError> {
    serde_json::to_string(record).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn encode_embedding(embedding: Option<&EmbeddingVector>) -> Result<Option<String>, RepositoryError> {
    embedding
        .map(|vector| serde_json::to_string(vector))
        .transpose()
        .map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_preference(row: &sqlx::sqlite::SqliteRow) -> Result<StoredPreference, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let preferences_json: String =
        row.try_get("preferences_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let embedding_json: Option<String> =
        row.try_get("embedding_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let text_summary: String =
        row.try_get("text_summary").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let preferences: PreferenceRecord = serde_json::from_str(&preferences_json)
        .map_err(|e| RepositoryError::Decode(format!("preferences_json: {e}")))?;
    let embedding = embedding_json
        .map(|raw| serde_json::from_str::<EmbeddingVector>(&raw))
        .transpose()
        .map_err(|e| RepositoryError::Decode(format!("embedding_json: {e}")))?;

    Ok(StoredPreference {
        id,
        user_id: UserId(user_id),
        preferences,
        embedding,
        text_summary,
        created_at: parse_timestamp("created_at", &created_at_str)?,
        updated_at: parse_timestamp("updated_at", &updated_at_str)?,
    })
}
