use std::time::Duration;

use reqwest::{Client, Response};

use tastematch_core::embedding::EmbeddingError;
use tastematch_core::errors::ApplicationError;

const ERROR_BODY_LIMIT: usize = 200;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, ApplicationError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| ApplicationError::Configuration(format!("http client: {error}")))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub(crate) fn embedding_transport_error(error: reqwest::Error, timeout_secs: u64) -> EmbeddingError {
    if error.is_timeout() {
        EmbeddingError::Timeout(timeout_secs)
    } else {
        EmbeddingError::Generation(error.to_string())
    }
}

/// Turns a non-success response into a short description including the body.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    if snippet.trim().is_empty() {
        format!("endpoint returned {status}")
    } else {
        format!("endpoint returned {status}: {}", snippet.trim())
    }
}
