pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tastematch_core::config::{ConfigOverrides, EmbeddingProviderKind};

#[derive(Debug, Parser)]
#[command(
    name = "tastematch",
    about = "Tastematch operator CLI",
    long_about = "Store user taste profiles, embed catalog products and rank users by preference similarity.",
    after_help = "Examples:\n  tastematch doctor --json\n  tastematch preferences store --user u-42 --file prefs.json\n  tastematch match linen-shirt-42 --threshold 0.6"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Flags that take precedence over file and environment configuration.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_provider, help = "Override embedding.provider (openai|ollama)")]
    embedding_provider: Option<EmbeddingProviderKind>,
    #[arg(long, global = true, help = "Override embedding.model")]
    embedding_model: Option<String>,
    #[arg(long, global = true, help = "Override catalog.base_url")]
    catalog_base_url: Option<String>,
}

impl GlobalArgs {
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database_url: self.database_url.clone(),
            log_level: self.log_level.clone(),
            embedding_provider: self.embedding_provider,
            embedding_model: self.embedding_model.clone(),
            catalog_base_url: self.catalog_base_url.clone(),
            ..ConfigOverrides::default()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, embedding and catalog readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(subcommand, about = "Manage stored user preference records")]
    Preferences(PreferencesCommand),
    #[command(about = "Fetch a catalog product and report its text summary and embedding")]
    Product {
        #[arg(help = "Catalog product slug")]
        slug: String,
    },
    #[command(about = "Rank stored users by similarity to a catalog product")]
    Match {
        #[arg(help = "Catalog product slug")]
        slug: String,
        #[arg(long, help = "Minimum similarity in [-1, 1]; defaults to matching.default_threshold")]
        threshold: Option<f64>,
    },
}

#[derive(Debug, Subcommand)]
enum PreferencesCommand {
    #[command(about = "Persist a preference record (JSON) for a user, replacing any earlier one")]
    Store {
        #[arg(long, help = "User identifier")]
        user: String,
        #[arg(long, help = "Path to a JSON preference record")]
        file: PathBuf,
    },
}

fn parse_provider(value: &str) -> Result<EmbeddingProviderKind, String> {
    value.parse::<EmbeddingProviderKind>().map_err(|error| error.to_string())
}

impl Cli {
    pub fn global(&self) -> &GlobalArgs {
        &self.global
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let overrides = cli.global.overrides();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(overrides),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(overrides) }
        }
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(json, overrides),
        },
        Command::Preferences(PreferencesCommand::Store { user, file }) => {
            commands::preferences::store(&user, &file, overrides)
        }
        Command::Product { slug } => commands::product::run(&slug, overrides),
        Command::Match { slug, threshold } => commands::matches::run(&slug, threshold, overrides),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
