use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::DEFAULT_EMBEDDING_MODEL;
use crate::matching::DEFAULT_THRESHOLD;

pub const DEFAULT_CONFIG_FILE: &str = "tastematch.toml";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub cache_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub application_id: Option<String>,
    pub application_token: Option<SecretString>,
    pub timeout_secs: u64,
}

impl CatalogConfig {
    pub fn is_configured(&self) -> bool {
        self.base_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct MatchingConfig {
    pub default_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub embedding_provider: Option<EmbeddingProviderKind>,
    pub embedding_model: Option<String>,
    pub embedding_api_key: Option<String>,
    pub catalog_base_url: Option<String>,
    pub default_threshold: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tastematch.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProviderKind::OpenAi,
                api_key: None,
                base_url: Some(DEFAULT_OPENAI_BASE_URL.to_string()),
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
                timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                cache_enabled: false,
            },
            catalog: CatalogConfig {
                base_url: None,
                application_id: None,
                application_token: None,
                timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            matching: MatchingConfig { default_threshold: DEFAULT_THRESHOLD },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported embedding provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(api_key) = embedding.api_key {
                self.embedding.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = Some(base_url);
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
            if let Some(cache_enabled) = embedding.cache_enabled {
                self.embedding.cache_enabled = cache_enabled;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = Some(base_url);
            }
            if let Some(application_id) = catalog.application_id {
                self.catalog.application_id = Some(application_id);
            }
            if let Some(application_token) = catalog.application_token {
                self.catalog.application_token = Some(secret_value(application_token));
            }
            if let Some(timeout_secs) = catalog.timeout_secs {
                self.catalog.timeout_secs = timeout_secs;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(default_threshold) = matching.default_threshold {
                self.matching.default_threshold = default_threshold;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TASTEMATCH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TASTEMATCH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TASTEMATCH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TASTEMATCH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TASTEMATCH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_PROVIDER") {
            self.embedding.provider = value.parse()?;
        }
        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(value);
        }
        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_u64("TASTEMATCH_EMBEDDING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TASTEMATCH_EMBEDDING_CACHE_ENABLED") {
            self.embedding.cache_enabled =
                parse_bool("TASTEMATCH_EMBEDDING_CACHE_ENABLED", &value)?;
        }

        if let Some(value) = read_env("TASTEMATCH_CATALOG_BASE_URL") {
            self.catalog.base_url = Some(value);
        }
        if let Some(value) = read_env("TASTEMATCH_CATALOG_APPLICATION_ID") {
            self.catalog.application_id = Some(value);
        }
        if let Some(value) = read_env("TASTEMATCH_CATALOG_APPLICATION_TOKEN") {
            self.catalog.application_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("TASTEMATCH_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_u64("TASTEMATCH_CATALOG_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TASTEMATCH_MATCHING_DEFAULT_THRESHOLD") {
            self.matching.default_threshold =
                parse_f64("TASTEMATCH_MATCHING_DEFAULT_THRESHOLD", &value)?;
        }

        let log_level =
            read_env("TASTEMATCH_LOGGING_LEVEL").or_else(|| read_env("TASTEMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TASTEMATCH_LOGGING_FORMAT").or_else(|| read_env("TASTEMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(api_key) = overrides.embedding_api_key {
            self.embedding.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.catalog_base_url {
            self.catalog.base_url = Some(base_url);
        }
        if let Some(threshold) = overrides.default_threshold {
            self.matching.default_threshold = threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_embedding(&self.embedding)?;
        validate_catalog(&self.catalog)?;
        validate_matching(&self.matching)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config/tastematch.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.timeout_secs == 0 || embedding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embedding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if embedding.model.trim().is_empty() {
        return Err(ConfigError::Validation("embedding.model must not be empty".to_string()));
    }

    match embedding.provider {
        EmbeddingProviderKind::OpenAi => {
            let missing = embedding
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "embedding.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        EmbeddingProviderKind::Ollama => {
            let missing =
                embedding.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "embedding.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &embedding.base_url {
        require_http_url("embedding.base_url", base_url)?;
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if catalog.timeout_secs == 0 || catalog.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "catalog.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    let Some(base_url) = &catalog.base_url else {
        return Ok(());
    };
    require_http_url("catalog.base_url", base_url)?;

    let has_id = catalog.application_id.as_ref().is_some_and(|id| !id.trim().is_empty());
    let has_token = catalog
        .application_token
        .as_ref()
        .is_some_and(|token| !token.expose_secret().trim().is_empty());
    if !has_id || !has_token {
        return Err(ConfigError::Validation(
            "catalog.application_id and catalog.application_token are required when catalog.base_url is set"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    let threshold = matching.default_threshold;
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(ConfigError::Validation(
            "matching.default_threshold must be in range -1.0..=1.0".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    embedding: Option<EmbeddingPatch>,
    catalog: Option<CatalogPatch>,
    matching: Option<MatchingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    provider: Option<EmbeddingProviderKind>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    cache_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    base_url: Option<String>,
    application_id: Option<String>,
    application_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    default_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, EmbeddingProviderKind, LoadOptions, LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_EMBEDDING_KEY", "sk-from-env");
        env::set_var("TEST_CATALOG_TOKEN", "catalog-token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tastematch.toml");
            fs::write(
                &path,
                r#"
[embedding]
api_key = "${TEST_EMBEDDING_KEY}"

[catalog]
base_url = "https://api.fynd.com/service/application/catalog/v1.0"
application_id = "app-123"
application_token = "${TEST_CATALOG_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.embedding.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "embedding key should be loaded from environment",
            )?;
            ensure(
                config
                    .catalog
                    .application_token
                    .as_ref()
                    .map(|token| token.expose_secret() == "catalog-token-from-env")
                    == Some(true),
                "catalog token should be loaded from environment",
            )?;
            ensure(config.catalog.is_configured(), "catalog should be configured")?;
            Ok(())
        })();

        clear_vars(&["TEST_EMBEDDING_KEY", "TEST_CATALOG_TOKEN"]);
        result
    }

    #[test]
    fn defaults_match_documented_values() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-test");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.database.url == "sqlite://tastematch.db", "default database url")?;
            ensure(
                config.embedding.provider == EmbeddingProviderKind::OpenAi,
                "openai is the default provider",
            )?;
            ensure(config.embedding.model == "text-embedding-3-small", "default model")?;
            ensure(config.embedding.timeout_secs == 15, "embedding timeout defaults to 15s")?;
            ensure(!config.embedding.cache_enabled, "embedding cache is opt-in")?;
            ensure(!config.catalog.is_configured(), "catalog is unconfigured by default")?;
            ensure(config.matching.default_threshold == 0.7, "default threshold is 0.7")?;
            Ok(())
        })();

        clear_vars(&["TASTEMATCH_EMBEDDING_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-test");
        env::set_var("TASTEMATCH_LOG_LEVEL", "warn");
        env::set_var("TASTEMATCH_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "TASTEMATCH_EMBEDDING_API_KEY",
            "TASTEMATCH_LOG_LEVEL",
            "TASTEMATCH_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-from-env");
        env::set_var("TASTEMATCH_MATCHING_DEFAULT_THRESHOLD", "0.65");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tastematch.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[embedding]
api_key = "sk-from-file"
model = "text-embedding-3-large"

[matching]
default_threshold = 0.8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.embedding.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "env api key should win over file and defaults",
            )?;
            ensure(
                config.embedding.model == "text-embedding-3-large",
                "file model should win over defaults",
            )?;
            ensure(
                config.matching.default_threshold == 0.65,
                "env threshold should win over file",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "TASTEMATCH_DATABASE_URL",
            "TASTEMATCH_EMBEDDING_API_KEY",
            "TASTEMATCH_MATCHING_DEFAULT_THRESHOLD",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        clear_vars(&["TASTEMATCH_EMBEDDING_API_KEY", "TASTEMATCH_EMBEDDING_PROVIDER"]);

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("embedding.api_key")
        );
        ensure(has_message, "validation failure should mention embedding.api_key")
    }

    #[test]
    fn ollama_provider_needs_no_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_PROVIDER", "ollama");
        env::set_var("TASTEMATCH_EMBEDDING_BASE_URL", "http://localhost:11434");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.embedding.provider == EmbeddingProviderKind::Ollama,
                "provider should come from env",
            )?;
            ensure(config.embedding.api_key.is_none(), "no api key is required for ollama")
        })();

        clear_vars(&["TASTEMATCH_EMBEDDING_PROVIDER", "TASTEMATCH_EMBEDDING_BASE_URL"]);
        result
    }

    #[test]
    fn catalog_requires_credentials_when_enabled() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-test");
        env::set_var("TASTEMATCH_CATALOG_BASE_URL", "https://catalog.example.com");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected catalog credential validation failure".to_string()),
            Err(ConfigError::Validation(message)) if message.contains("catalog.application_id") => {
                Ok(())
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["TASTEMATCH_EMBEDDING_API_KEY", "TASTEMATCH_CATALOG_BASE_URL"]);
        result
    }

    #[test]
    fn threshold_outside_unit_range_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-test");

        let result = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { default_threshold: Some(1.5), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        }) {
            Ok(_) => Err("expected threshold validation failure".to_string()),
            Err(ConfigError::Validation(message)) if message.contains("default_threshold") => Ok(()),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["TASTEMATCH_EMBEDDING_API_KEY"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TASTEMATCH_EMBEDDING_API_KEY", "sk-secret-value");
        env::set_var("TASTEMATCH_CATALOG_BASE_URL", "https://catalog.example.com");
        env::set_var("TASTEMATCH_CATALOG_APPLICATION_ID", "app-1");
        env::set_var("TASTEMATCH_CATALOG_APPLICATION_TOKEN", "catalog-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("catalog-secret-value"),
                "debug output should not contain catalog token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "TASTEMATCH_EMBEDDING_API_KEY",
            "TASTEMATCH_CATALOG_BASE_URL",
            "TASTEMATCH_CATALOG_APPLICATION_ID",
            "TASTEMATCH_CATALOG_APPLICATION_TOKEN",
        ]);
        result
    }
}
