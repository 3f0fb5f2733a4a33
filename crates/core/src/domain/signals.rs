//! Behavioural signals derived from a user's swipe history.
//!
//! Signals are computed once from the raw like/dislike interaction sequences
//! when preferences are submitted and are replaced wholesale on the next
//! submission.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::DEFAULT_CURRENCY_SYMBOL;

pub const PREFERRED_BRAND_MIN_AFFINITY: f64 = 0.7;
pub const PREFERRED_BRAND_MIN_LIKES: u32 = 2;
pub const HIGH_PRICE_CONSCIOUSNESS_DISCOUNT: f64 = 15.0;
pub const MEDIUM_PRICE_CONSCIOUSNESS_DISCOUNT: f64 = 5.0;
const RANGE_MIN_FACTOR: f64 = 0.8;
const RANGE_MAX_FACTOR: f64 = 1.3;
const EMPTY_RANGE_MAX: f64 = 10_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Dislike,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPrice {
    pub effective: f64,
    pub marked: f64,
    pub currency: String,
}

/// One swipe on a catalog product during onboarding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInteraction {
    pub slug: String,
    pub name: String,
    #[serde(default = "unknown_brand")]
    pub brand: String,
    #[serde(default = "uncategorized")]
    pub category: String,
    pub price: InteractionPrice,
    #[serde(default)]
    pub discount: f64,
    pub interaction_type: InteractionKind,
    pub interaction_time: DateTime<Utc>,
    #[serde(default)]
    pub swipe_order: u32,
}

fn unknown_brand() -> String {
    "Unknown".to_owned()
}

fn uncategorized() -> String {
    "Uncategorized".to_owned()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceConsciousness {
    High,
    Medium,
    Low,
}

impl PriceConsciousness {
    pub fn from_average_discount(average_discount: f64) -> Self {
        if average_discount > HIGH_PRICE_CONSCIOUSNESS_DISCOUNT {
            Self::High
        } else if average_discount > MEDIUM_PRICE_CONSCIOUSNESS_DISCOUNT {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInsights {
    pub average_liked_price: f64,
    pub price_range_min: f64,
    pub price_range_max: f64,
    pub currency: String,
    /// Share of liked products that carried any discount, in `[0, 1]`.
    pub discount_sensitivity: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInsights {
    pub preferred_brands: Vec<String>,
    pub brand_affinity_scores: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInsight {
    pub category_name: String,
    pub like_count: u32,
    pub dislike_count: u32,
    pub affinity_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorMetrics {
    pub total_swipes: u32,
    pub like_rate: f64,
    pub skip_rate: f64,
    pub price_consciousness: PriceConsciousness,
    pub category_diversity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSignals {
    pub liked_products_data: Vec<ProductInteraction>,
    pub disliked_products_data: Vec<ProductInteraction>,
    pub price_insights: PriceInsights,
    pub brand_insights: BrandInsights,
    pub category_insights: Vec<CategoryInsight>,
    pub behavior_metrics: BehaviorMetrics,
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    likes: u32,
    dislikes: u32,
}

impl Tally {
    fn record(&mut self, kind: InteractionKind) {
        match kind {
            InteractionKind::Like => self.likes += 1,
            InteractionKind::Dislike => self.dislikes += 1,
        }
    }

    fn affinity(&self) -> f64 {
        let total = self.likes + self.dislikes;
        if total == 0 {
            0.0
        } else {
            f64::from(self.likes) / f64::from(total)
        }
    }
}

impl EnhancedSignals {
    pub fn derive(liked: Vec<ProductInteraction>, disliked: Vec<ProductInteraction>) -> Self {
        let price_insights = price_insights(&liked);
        let brand_insights = brand_insights(&liked, &disliked);
        let category_insights = category_insights(&liked, &disliked);
        let behavior_metrics = behavior_metrics(&liked, &disliked);

        Self {
            liked_products_data: liked,
            disliked_products_data: disliked,
            price_insights,
            brand_insights,
            category_insights,
            behavior_metrics,
        }
    }
}

fn price_insights(liked: &[ProductInteraction]) -> PriceInsights {
    let prices: Vec<f64> = liked.iter().map(|item| item.price.effective).collect();
    let currency = liked
        .first()
        .map(|item| item.price.currency.clone())
        .filter(|currency| !currency.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_owned());

    if prices.is_empty() {
        return PriceInsights {
            average_liked_price: 0.0,
            price_range_min: 0.0,
            price_range_max: EMPTY_RANGE_MAX,
            currency,
            discount_sensitivity: 0.0,
        };
    }

    let count = prices.len() as f64;
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let discounted = liked.iter().filter(|item| item.discount > 0.0).count() as f64;

    PriceInsights {
        average_liked_price: prices.iter().sum::<f64>() / count,
        price_range_min: min * RANGE_MIN_FACTOR,
        price_range_max: max * RANGE_MAX_FACTOR,
        currency,
        discount_sensitivity: discounted / count,
    }
}

fn brand_insights(liked: &[ProductInteraction], disliked: &[ProductInteraction]) -> BrandInsights {
    let tallies = tally_in_first_seen_order(liked, disliked, |item| item.brand.as_str());

    let mut insights = BrandInsights::default();
    for (brand, tally) in tallies {
        let affinity = tally.affinity();
        if affinity >= PREFERRED_BRAND_MIN_AFFINITY && tally.likes >= PREFERRED_BRAND_MIN_LIKES {
            insights.preferred_brands.push(brand.clone());
        }
        insights.brand_affinity_scores.insert(brand, affinity);
    }
    insights
}

fn category_insights(
    liked: &[ProductInteraction],
    disliked: &[ProductInteraction],
) -> Vec<CategoryInsight> {
    tally_in_first_seen_order(liked, disliked, |item| item.category.as_str())
        .into_iter()
        .map(|(category_name, tally)| CategoryInsight {
            category_name,
            like_count: tally.likes,
            dislike_count: tally.dislikes,
            affinity_score: tally.affinity(),
        })
        .collect()
}

fn behavior_metrics(liked: &[ProductInteraction], disliked: &[ProductInteraction]) -> BehaviorMetrics {
    let total = liked.len() + disliked.len();
    let like_rate = if total == 0 { 0.0 } else { liked.len() as f64 / total as f64 };
    let average_discount = if liked.is_empty() {
        0.0
    } else {
        liked.iter().map(|item| item.discount).sum::<f64>() / liked.len() as f64
    };
    let distinct_categories: HashSet<&str> =
        liked.iter().map(|item| item.category.as_str()).collect();

    BehaviorMetrics {
        total_swipes: u32::try_from(total).unwrap_or(u32::MAX),
        like_rate,
        skip_rate: 1.0 - like_rate,
        price_consciousness: PriceConsciousness::from_average_discount(average_discount),
        category_diversity: u32::try_from(distinct_categories.len()).unwrap_or(u32::MAX),
    }
}

fn tally_in_first_seen_order<'a>(
    liked: &'a [ProductInteraction],
    disliked: &'a [ProductInteraction],
    key: impl Fn(&'a ProductInteraction) -> &'a str,
) -> Vec<(String, Tally)> {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for item in liked.iter().chain(disliked.iter()) {
        let name = key(item);
        if !tallies.contains_key(name) {
            order.push(name.to_owned());
        }
        tallies.entry(name).or_default().record(item.interaction_type);
    }

    order
        .into_iter()
        .map(|name| {
            let tally = tallies.get(name.as_str()).copied().unwrap_or_default();
            (name, tally)
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::interaction;
    use super::{EnhancedSignals, InteractionKind, PriceConsciousness};

    #[test]
    fn empty_history_yields_neutral_signals() {
        let signals = EnhancedSignals::derive(Vec::new(), Vec::new());

        assert_eq!(signals.price_insights.average_liked_price, 0.0);
        assert_eq!(signals.price_insights.price_range_max, 10_000.0);
        assert_eq!(signals.price_insights.currency, "₹");
        assert_eq!(signals.behavior_metrics.total_swipes, 0);
        assert_eq!(signals.behavior_metrics.like_rate, 0.0);
        assert_eq!(signals.behavior_metrics.skip_rate, 1.0);
        assert_eq!(signals.behavior_metrics.price_consciousness, PriceConsciousness::Low);
        assert!(signals.category_insights.is_empty());
        assert!(signals.brand_insights.preferred_brands.is_empty());
    }

    #[test]
    fn price_insights_follow_liked_history() {
        let liked = vec![
            interaction("a", "Roadster", "Shirts", 1000.0, 20.0, InteractionKind::Like),
            interaction("b", "Roadster", "Shirts", 2000.0, 0.0, InteractionKind::Like),
        ];
        let signals = EnhancedSignals::derive(liked, Vec::new());

        assert_eq!(signals.price_insights.average_liked_price, 1500.0);
        assert_eq!(signals.price_insights.price_range_min, 800.0);
        assert_eq!(signals.price_insights.price_range_max, 2600.0);
        assert_eq!(signals.price_insights.discount_sensitivity, 0.5);
        assert_eq!(signals.behavior_metrics.price_consciousness, PriceConsciousness::Medium);
    }

    #[test]
    fn preferred_brands_need_two_likes_and_high_affinity() {
        let liked = vec![
            interaction("a", "Roadster", "Shirts", 900.0, 0.0, InteractionKind::Like),
            interaction("b", "Roadster", "Shirts", 950.0, 0.0, InteractionKind::Like),
            interaction("c", "Puma", "Shoes", 3000.0, 0.0, InteractionKind::Like),
        ];
        let disliked =
            vec![interaction("d", "Roadster", "Jeans", 1200.0, 0.0, InteractionKind::Dislike)];
        let signals = EnhancedSignals::derive(liked, disliked);

        // Roadster: 2 likes of 3 -> 0.67, below the cut-off. Puma: a single like.
        assert!(signals.brand_insights.preferred_brands.is_empty());
        let roadster = signals.brand_insights.brand_affinity_scores["Roadster"];
        assert!((roadster - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(signals.brand_insights.brand_affinity_scores["Puma"], 1.0);
    }

    #[test]
    fn category_insights_keep_first_seen_order() {
        let liked = vec![
            interaction("a", "Roadster", "Shirts", 900.0, 30.0, InteractionKind::Like),
            interaction("b", "Puma", "Shoes", 2500.0, 30.0, InteractionKind::Like),
        ];
        let disliked = vec![
            interaction("c", "Levis", "Jeans", 1900.0, 0.0, InteractionKind::Dislike),
            interaction("d", "Puma", "Shoes", 2100.0, 0.0, InteractionKind::Dislike),
        ];
        let signals = EnhancedSignals::derive(liked, disliked);

        let names: Vec<&str> =
            signals.category_insights.iter().map(|c| c.category_name.as_str()).collect();
        assert_eq!(names, vec!["Shirts", "Shoes", "Jeans"]);
        assert_eq!(signals.category_insights[1].like_count, 1);
        assert_eq!(signals.category_insights[1].dislike_count, 1);
        assert_eq!(signals.category_insights[1].affinity_score, 0.5);
        assert_eq!(signals.behavior_metrics.total_swipes, 4);
        assert_eq!(signals.behavior_metrics.like_rate, 0.5);
        assert_eq!(signals.behavior_metrics.category_diversity, 2);
        assert_eq!(signals.behavior_metrics.price_consciousness, PriceConsciousness::High);
    }
}
