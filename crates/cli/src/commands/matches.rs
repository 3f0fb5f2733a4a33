use tastematch_core::config::ConfigOverrides;
use tastematch_core::ProductSlug;

use crate::commands::{
    block_on, load_config, open_database, product_matcher, CommandFailure, CommandResult,
};

const COMMAND: &str = "match";

/// Ranks stored users against a catalog product. `threshold` falls back to
/// `matching.default_threshold`.
pub fn run(slug: &str, threshold: Option<f64>, overrides: ConfigOverrides) -> CommandResult {
    match execute(slug, threshold, overrides) {
        Ok(result) => result,
        Err(failure) => failure.into_result(COMMAND),
    }
}

fn execute(
    slug: &str,
    threshold: Option<f64>,
    overrides: ConfigOverrides,
) -> Result<CommandResult, CommandFailure> {
    let config = load_config(overrides)?;
    let threshold = threshold.unwrap_or(config.matching.default_threshold);
    let slug = ProductSlug(slug.to_string());

    let report = block_on(async {
        let pool = open_database(&config).await?;
        let matcher = product_matcher(&config, pool.clone())?;
        let report = matcher.find_matches(&slug, threshold).await;
        pool.close().await;
        Ok(report?)
    })?;

    let Some(report) = report else {
        return Err(CommandFailure::new("not_found", format!("product `{slug}` not found"), 8));
    };

    let message = format!(
        "{} match(es) for `{slug}` at threshold {}",
        report.total_matches, report.threshold
    );
    Ok(CommandResult::success_with(COMMAND, message, &report))
}
