use thiserror::Error;

use tastematch_core::errors::ApplicationError;

pub mod memory;
pub mod preference;

pub use memory::InMemoryPreferenceRepository;
pub use preference::SqlPreferenceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no preference record for user `{0}`")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        Self::Persistence(value.to_string())
    }
}
