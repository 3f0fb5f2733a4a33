pub mod config;
pub mod doctor;
pub mod matches;
pub mod migrate;
pub mod preferences;
pub mod product;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tastematch_adapters::{catalog_provider, embedding_provider};
use tastematch_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tastematch_core::errors::{ApplicationError, InterfaceError};
use tastematch_core::ProductMatcher;
use tastematch_db::{connect_with_settings, migrations, DbPool, SqlPreferenceRepository};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::completed(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::completed(command, message, Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn completed(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

/// Failure raised inside a command before it is rendered as an outcome.
#[derive(Debug)]
pub(crate) struct CommandFailure {
    error_class: &'static str,
    message: String,
    exit_code: u8,
}

impl CommandFailure {
    pub(crate) fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }

    pub(crate) fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.error_class, self.message, self.exit_code)
    }
}

impl From<ApplicationError> for CommandFailure {
    fn from(error: ApplicationError) -> Self {
        if let ApplicationError::Configuration(message) = error {
            return Self::new("config_validation", message, 2);
        }

        let correlation_id = uuid::Uuid::new_v4().to_string();
        tracing::warn!(
            event_name = "cli.command.failed",
            correlation_id = %correlation_id,
            error = %error,
            "command failed"
        );
        match error.into_interface(correlation_id) {
            InterfaceError::BadRequest { message, .. } => Self::new("input", message, 6),
            InterfaceError::ServiceUnavailable { message, .. } => {
                Self::new("collaborator", message, 7)
            }
            InterfaceError::Internal { message, .. } => Self::new("internal", message, 1),
        }
    }
}

pub(crate) fn load_config(overrides: ConfigOverrides) -> Result<AppConfig, CommandFailure> {
    AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }).map_err(|error| {
        CommandFailure::new("config_validation", format!("configuration issue: {error}"), 2)
    })
}

/// Runs `future` on a fresh current-thread runtime.
pub(crate) fn block_on<T>(
    future: impl Future<Output = Result<T, CommandFailure>>,
) -> Result<T, CommandFailure> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandFailure::new(
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;
    runtime.block_on(future)
}

/// Connects to the configured database and applies pending migrations.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;
    Ok(pool)
}

pub(crate) fn product_matcher(
    config: &AppConfig,
    pool: DbPool,
) -> Result<ProductMatcher, CommandFailure> {
    let catalog = catalog_provider(&config.catalog)?.ok_or_else(|| {
        CommandFailure::new("config_validation", "catalog.base_url is not configured", 2)
    })?;
    let embedder = embedding_provider(&config.embedding)?;
    Ok(ProductMatcher::new(catalog, embedder, Arc::new(SqlPreferenceRepository::new(pool))))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
