use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tastematch_cli::Cli;
use tastematch_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

/// Logs go to stderr so stdout carries only command outcomes.
fn init_logging(cli: &Cli) -> Result<()> {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let level = cli.global().log_level().unwrap_or(config.logging.level.as_str());
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);
    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(anyhow::Error::msg).context("failed to install tracing subscriber")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&cli) {
        eprintln!("logging disabled: {error:#}");
    }
    tastematch_cli::run(cli)
}
