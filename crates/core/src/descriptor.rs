//! Canonical text descriptions fed to the embedding model.
//!
//! Output is a pure function of the input record: the same record always
//! produces byte-identical text.

use crate::domain::preference::PreferenceRecord;
use crate::domain::product::ProductDescriptor;
use crate::domain::signals::{CategoryInsight, EnhancedSignals};
use crate::errors::DomainError;

pub const TOP_CATEGORY_LIMIT: usize = 3;
pub const TOP_CATEGORY_MIN_AFFINITY: f64 = 0.5;
pub const LIKED_SAMPLE_LIMIT: usize = 3;

pub fn describe_preferences(record: &PreferenceRecord) -> String {
    match &record.enhanced {
        Some(signals) => describe_with_signals(record, signals),
        None => describe_declared(record),
    }
}

pub fn describe_product(product: &ProductDescriptor) -> Result<String, DomainError> {
    if product.name.trim().is_empty() {
        return Err(DomainError::MissingField("name".to_owned()));
    }

    let text = format!(
        "Product: {} by {}. Category: {} in {}. Price: {}{}. Discount: {}%. Description: {}. Available sizes: {}.",
        product.name,
        product.brand,
        product.category,
        product.department,
        product.currency_symbol,
        product.effective_price,
        product.discount_pct,
        product.description,
        product.sizes.join(", "),
    );
    Ok(text.trim().to_owned())
}

/// Renders a stored currency code as its symbol; unknown values pass through.
pub fn currency_symbol(currency: &str) -> &str {
    match currency.trim().to_ascii_uppercase().as_str() {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        _ => currency.trim(),
    }
}

fn describe_declared(record: &PreferenceRecord) -> String {
    let range = &record.price_range;
    format!(
        "User prefers categories: {}. Price range: {}{}-{}. Brands: {}.",
        record.selected_categories.join(", "),
        currency_symbol(&range.currency),
        range.min,
        range.max,
        record.selected_brands.join(", "),
    )
}

fn describe_with_signals(record: &PreferenceRecord, signals: &EnhancedSignals) -> String {
    let range = &record.price_range;
    let price = &signals.price_insights;
    let behavior = &signals.behavior_metrics;

    let mut clauses = vec![
        "User shopping preferences:".to_owned(),
        format!(
            "Avg liked price {}{}.",
            currency_symbol(&price.currency),
            price.average_liked_price.round()
        ),
        format!("Price range {}{}-{}.", currency_symbol(&range.currency), range.min, range.max),
        format!("{} price consciousness.", behavior.price_consciousness.as_str()),
        format!("{}% discount sensitivity.", percent(price.discount_sensitivity)),
    ];

    let brands = &signals.brand_insights.preferred_brands;
    if !brands.is_empty() {
        clauses.push(format!("Preferred brands: {}.", brands.join(", ")));
    }

    let categories = top_categories(&signals.category_insights);
    if !categories.is_empty() {
        clauses.push(format!("Top categories: {}.", categories.join(", ")));
    }

    clauses.push(format!("{}% like rate.", percent(behavior.like_rate)));

    let liked: Vec<String> = signals
        .liked_products_data
        .iter()
        .take(LIKED_SAMPLE_LIMIT)
        .map(|item| format!("{} by {}", item.name, item.brand))
        .collect();
    if !liked.is_empty() {
        clauses.push(format!("Liked: {}.", liked.join(", ")));
    }

    clauses.join(" ").trim().to_owned()
}

/// Categories above the affinity cut-off, strongest first. Ties keep their
/// first-seen order.
pub fn top_categories(insights: &[CategoryInsight]) -> Vec<&str> {
    let mut qualifying: Vec<&CategoryInsight> = insights
        .iter()
        .filter(|insight| insight.affinity_score > TOP_CATEGORY_MIN_AFFINITY)
        .collect();
    qualifying.sort_by(|a, b| b.affinity_score.total_cmp(&a.affinity_score));
    qualifying
        .into_iter()
        .take(TOP_CATEGORY_LIMIT)
        .map(|insight| insight.category_name.as_str())
        .collect()
}

fn percent(fraction: f64) -> f64 {
    (fraction * 100.0).round()
}
