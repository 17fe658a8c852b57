//! Ranking pipeline: score, filter, stable-sort, truncate.

use crate::domain::customer::CustomerProfile;
use crate::domain::product::ProductRecord;
use crate::errors::DomainError;

use super::scoring::{Jitter, ScoreCalculator, ScoringWeights};
use super::{MAX_SIMILAR_BOOST, SIMILAR_BOOST_STEP};

/// A candidate product with its final score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub product: ProductRecord,
    pub score: f64,
}

#[derive(Debug)]
pub struct RankingEngine {
    calculator: ScoreCalculator,
    min_score: f64,
}

impl RankingEngine {
    pub fn new(jitter: Jitter, min_score: f64) -> Self {
        Self { calculator: ScoreCalculator::new(jitter), min_score }
    }

    pub fn with_weights(
        weights: ScoringWeights,
        jitter: Jitter,
        min_score: f64,
    ) -> Result<Self, DomainError> {
        weights.validate()?;
        Ok(Self { calculator: ScoreCalculator::with_weights(weights, jitter), min_score })
    }

    /// Rank a candidate pool for one customer: score every candidate, drop
    /// those below the admission threshold, sort descending (ties keep their
    /// pool order), and keep the first `limit`.
    pub fn rank(
        &mut self,
        customer: &CustomerProfile,
        candidates: Vec<ProductRecord>,
        limit: usize,
    ) -> Vec<ScoredCandidate> {
        let scored = candidates
            .into_iter()
            .map(|product| {
                let score = self.calculator.score(customer, &product);
                ScoredCandidate { product, score }
            })
            .collect();
        self.finish(scored, limit)
    }

    /// Like [`rank`](Self::rank), but adds a per-product boost from
    /// co-recommendation counts before thresholding.
    pub fn rank_with_boosts(
        &mut self,
        customer: &CustomerProfile,
        candidates: Vec<(ProductRecord, u32)>,
        limit: usize,
    ) -> Vec<ScoredCandidate> {
        let scored = candidates
            .into_iter()
            .map(|(product, count)| {
                let score = (self.calculator.score(customer, &product)
                    + co_recommendation_boost(count))
                .clamp(0.0, 1.0);
                ScoredCandidate { product, score }
            })
            .collect();
        self.finish(scored, limit)
    }

    fn finish(&self, mut scored: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        scored.retain(|candidate| candidate.score >= self.min_score);
        // Vec::sort_by is stable, so equal scores keep candidate-pool order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}

/// 0.1 per co-recommendation among similar customers, capped at 0.3.
pub fn co_recommendation_boost(count: u32) -> f64 {
    (f64::from(count) * SIMILAR_BOOST_STEP).min(MAX_SIMILAR_BOOST)
}
