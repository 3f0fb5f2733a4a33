//! Scores one product against the stored preference population and applies
//! the exclusion and tiering rules.

use std::cmp::Ordering;

use crate::domain::product::ProductDescriptor;
use crate::errors::DomainError;
use crate::similarity::{cosine_similarity, round_score};

use super::types::{Candidate, MatchReport, MatchResult, MatchTier};
use super::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEvaluator {
    threshold: f64,
}

impl Default for MatchEvaluator {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD }
    }
}

impl MatchEvaluator {
    pub fn new(threshold: f64) -> Result<Self, DomainError> {
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(DomainError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Ranks the population against `product_vector`.
    ///
    /// Users without an embedding are skipped, users who disliked the
    /// product are excluded, and everyone scoring below the threshold is
    /// dropped. Both the raw score and the two-decimal score that gets
    /// reported must reach the threshold. Output is ordered by full-precision similarity, descending,
    /// with user id ascending as the tie-break.
    pub fn evaluate(
        &self,
        product: &ProductDescriptor,
        product_vector: &[f32],
        population: &[Candidate],
    ) -> Result<MatchReport, DomainError> {
        product.validate()?;
        if product_vector.is_empty() {
            return Err(DomainError::MissingField("product embedding".to_owned()));
        }

        let slug = product.slug.as_str();
        let mut scored: Vec<(f64, MatchResult)> = Vec::new();

        for candidate in population {
            let Some(user_vector) = candidate.embedding.as_deref() else {
                continue;
            };

            if candidate.preferences.has_disliked(slug) {
                continue;
            }

            let similarity = cosine_similarity(product_vector, user_vector)?;
            let reported = round_score(similarity);
            if !(similarity >= self.threshold && reported >= self.threshold) {
                continue;
            }

            let previously_liked = candidate.preferences.has_liked(slug);
            scored.push((
                similarity,
                MatchResult {
                    user_id: candidate.user_id.clone(),
                    similarity: reported,
                    match_quality: MatchTier::for_prior_like(previously_liked),
                    previously_liked,
                    user_preferences: candidate.preferences.clone(),
                },
            ));
        }

        scored.sort_by(|(left_score, left), (right_score, right)| {
            right_score
                .partial_cmp(left_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.user_id.cmp(&right.user_id))
        });

        let matches: Vec<MatchResult> = scored.into_iter().map(|(_, result)| result).collect();
        Ok(MatchReport {
            product: product.clone(),
            total_matches: matches.len(),
            matches,
            threshold: self.threshold,
        })
    }
}
