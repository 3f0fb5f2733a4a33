use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tastematch_core::config::{AppConfig, ConfigOverrides, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

struct Field {
    key: &'static str,
    env_key: &'static str,
    value: String,
    overridden: bool,
}

pub fn run(overrides: ConfigOverrides) -> String {
    let flags = overrides.clone();
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in fields(&config, &flags) {
        let source = if field.overridden {
            "flag".to_string()
        } else {
            field_source(
                field.key,
                field.env_key,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig, flags: &ConfigOverrides) -> Vec<Field> {
    vec![
        Field {
            key: "database.url",
            env_key: "TASTEMATCH_DATABASE_URL",
            value: config.database.url.clone(),
            overridden: flags.database_url.is_some(),
        },
        Field {
            key: "database.max_connections",
            env_key: "TASTEMATCH_DATABASE_MAX_CONNECTIONS",
            value: config.database.max_connections.to_string(),
            overridden: false,
        },
        Field {
            key: "embedding.provider",
            env_key: "TASTEMATCH_EMBEDDING_PROVIDER",
            value: config.embedding.provider.as_str().to_string(),
            overridden: flags.embedding_provider.is_some(),
        },
        Field {
            key: "embedding.model",
            env_key: "TASTEMATCH_EMBEDDING_MODEL",
            value: config.embedding.model.clone(),
            overridden: flags.embedding_model.is_some(),
        },
        Field {
            key: "embedding.base_url",
            env_key: "TASTEMATCH_EMBEDDING_BASE_URL",
            value: config.embedding.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            overridden: false,
        },
        Field {
            key: "embedding.api_key",
            env_key: "TASTEMATCH_EMBEDDING_API_KEY",
            value: redact_secret(config.embedding.api_key.as_ref()),
            overridden: flags.embedding_api_key.is_some(),
        },
        Field {
            key: "embedding.timeout_secs",
            env_key: "TASTEMATCH_EMBEDDING_TIMEOUT_SECS",
            value: config.embedding.timeout_secs.to_string(),
            overridden: false,
        },
        Field {
            key: "embedding.cache_enabled",
            env_key: "TASTEMATCH_EMBEDDING_CACHE_ENABLED",
            value: config.embedding.cache_enabled.to_string(),
            overridden: false,
        },
        Field {
            key: "catalog.base_url",
            env_key: "TASTEMATCH_CATALOG_BASE_URL",
            value: config.catalog.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            overridden: flags.catalog_base_url.is_some(),
        },
        Field {
            key: "catalog.application_id",
            env_key: "TASTEMATCH_CATALOG_APPLICATION_ID",
            value: config
                .catalog
                .application_id
                .clone()
                .unwrap_or_else(|| "<unset>".to_string()),
            overridden: false,
        },
        Field {
            key: "catalog.application_token",
            env_key: "TASTEMATCH_CATALOG_APPLICATION_TOKEN",
            value: redact_secret(config.catalog.application_token.as_ref()),
            overridden: false,
        },
        Field {
            key: "matching.default_threshold",
            env_key: "TASTEMATCH_MATCHING_DEFAULT_THRESHOLD",
            value: config.matching.default_threshold.to_string(),
            overridden: flags.default_threshold.is_some(),
        },
        Field {
            key: "logging.level",
            env_key: "TASTEMATCH_LOGGING_LEVEL",
            value: config.logging.level.clone(),
            overridden: flags.log_level.is_some(),
        },
        Field {
            key: "logging.format",
            env_key: "TASTEMATCH_LOGGING_FORMAT",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            overridden: false,
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows only a short prefix of keys such as `sk-...`.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
