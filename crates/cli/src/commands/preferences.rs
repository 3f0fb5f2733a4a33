use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tastematch_adapters::embedding_provider;
use tastematch_core::config::ConfigOverrides;
use tastematch_core::{PreferenceCoordinator, PreferenceRecord, UserId};
use tastematch_db::SqlPreferenceRepository;

use crate::commands::{block_on, load_config, open_database, CommandFailure, CommandResult};

const COMMAND: &str = "preferences.store";

/// Reads a preference record from `file` and persists it for `user`,
/// replacing any earlier record.
pub fn store(user: &str, file: &Path, overrides: ConfigOverrides) -> CommandResult {
    match execute(user, file, overrides) {
        Ok(result) => result,
        Err(failure) => failure.into_result(COMMAND),
    }
}

fn execute(
    user: &str,
    file: &Path,
    overrides: ConfigOverrides,
) -> Result<CommandResult, CommandFailure> {
    let config = load_config(overrides)?;
    let record = read_record(file)?;
    let embedder = embedding_provider(&config.embedding)?;

    let stored = block_on(async {
        let pool = open_database(&config).await?;
        let coordinator = PreferenceCoordinator::new(
            embedder,
            Arc::new(SqlPreferenceRepository::new(pool.clone())),
        );
        let stored = coordinator.persist(&UserId(user.to_string()), record).await;
        pool.close().await;
        Ok(stored?)
    })?;

    let dimensions = stored.embedding.as_ref().map(Vec::len).unwrap_or_default();
    Ok(CommandResult::success_with(
        COMMAND,
        format!("stored preferences for `{}`", stored.user_id),
        json!({
            "id": stored.id,
            "userId": stored.user_id,
            "textSummary": stored.text_summary,
            "dimensions": dimensions,
            "updatedAt": stored.updated_at,
        }),
    ))
}

fn read_record(file: &Path) -> Result<PreferenceRecord, CommandFailure> {
    let raw = fs::read_to_string(file).map_err(|error| {
        CommandFailure::new("input", format!("could not read `{}`: {error}", file.display()), 6)
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        CommandFailure::new(
            "input",
            format!("`{}` is not a valid preference record: {error}", file.display()),
            6,
        )
    })
}
