use serde_json::json;
use tastematch_core::config::ConfigOverrides;
use tastematch_core::ProductSlug;

use crate::commands::{
    block_on, load_config, open_database, product_matcher, CommandFailure, CommandResult,
};

const COMMAND: &str = "product";

/// Fetches a product from the catalog and reports its text summary and
/// embedding size.
pub fn run(slug: &str, overrides: ConfigOverrides) -> CommandResult {
    match execute(slug, overrides) {
        Ok(result) => result,
        Err(failure) => failure.into_result(COMMAND),
    }
}

fn execute(slug: &str, overrides: ConfigOverrides) -> Result<CommandResult, CommandFailure> {
    let config = load_config(overrides)?;
    let slug = ProductSlug(slug.to_string());

    let embedded = block_on(async {
        let pool = open_database(&config).await?;
        let matcher = product_matcher(&config, pool.clone())?;
        let embedded = matcher.product_embedding(&slug).await;
        pool.close().await;
        Ok(embedded?)
    })?;

    let Some(embedded) = embedded else {
        return Err(CommandFailure::new("not_found", format!("product `{slug}` not found"), 8));
    };

    Ok(CommandResult::success_with(
        COMMAND,
        format!("embedded product `{slug}`"),
        json!({
            "product": embedded.product,
            "textSummary": embedded.text_summary,
            "dimensions": embedded.embedding.len(),
            "model": config.embedding.model,
        }),
    ))
}
