//! Scoring formula for product recommendations

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::customer::CustomerProfile;
use crate::domain::product::ProductRecord;
use crate::errors::DomainError;

use super::{DEFAULT_PRODUCT_RATING, JITTER_RANGE, PRICE_DIFF_FLOOR};

/// Weights for the linear scoring components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight for history-based category affinity (default: 0.40)
    pub category_affinity: f64,
    /// Weight for price proximity to the customer's average order (default: 0.30)
    pub price_fit: f64,
    /// Weight for product rating (default: 0.30)
    pub quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    /// Each weight must be finite and non-negative, and together they must
    /// carry some weight at all.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, weight) in [
            ("category_affinity", self.category_affinity),
            ("price_fit", self.price_fit),
            ("quality", self.quality),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DomainError::InvalidWeights(format!(
                    "{name} weight must be finite and non-negative, got {weight}"
                )));
            }
        }
        if self.category_affinity + self.price_fit + self.quality <= 0.0 {
            return Err(DomainError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Jitter policy for the score formula. Production callers use `Entropy`;
/// tests pin a seed or disable jitter entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    Entropy,
    Seeded(u64),
    Disabled,
}

/// Score calculator applying the fixed linear formula.
#[derive(Debug)]
pub struct ScoreCalculator {
    weights: ScoringWeights,
    rng: Option<StdRng>,
}

impl ScoreCalculator {
    pub fn new(jitter: Jitter) -> Self {
        Self::with_weights(ScoringWeights::default(), jitter)
    }

    pub fn with_weights(weights: ScoringWeights, jitter: Jitter) -> Self {
        let rng = match jitter {
            Jitter::Entropy => Some(StdRng::from_entropy()),
            Jitter::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
            Jitter::Disabled => None,
        };
        Self { weights, rng }
    }

    /// Combined score for one customer/product pair, clamped to [0, 1].
    pub fn score(&mut self, customer: &CustomerProfile, product: &ProductRecord) -> f64 {
        let base = self.weights.category_affinity * category_affinity(customer, product)
            + self.weights.price_fit * price_fit(customer, product)
            + self.weights.quality * quality(product);

        let jitter = match self.rng.as_mut() {
            Some(rng) => rng.gen_range(-JITTER_RANGE..=JITTER_RANGE),
            None => 0.0,
        };

        (base + jitter).clamp(0.0, 1.0)
    }
}

/// 0.3 for a browsing-history hit plus 0.5 for a purchase-history hit,
/// capped at 0.8. A hit is the product category appearing within a history
/// entry, case-sensitively.
pub fn category_affinity(customer: &CustomerProfile, product: &ProductRecord) -> f64 {
    let mut affinity: f64 = 0.0;
    if history_contains(&customer.browsing_history, &product.category) {
        affinity += 0.3;
    }
    if history_contains(&customer.purchase_history, &product.category) {
        affinity += 0.5;
    }
    affinity.min(0.8)
}

fn history_contains(history: &[String], category: &str) -> bool {
    history.iter().any(|entry| entry.contains(category))
}

/// 1 minus the normalized distance between the product price and the
/// customer's average order value. Zero when no order history exists.
pub fn price_fit(customer: &CustomerProfile, product: &ProductRecord) -> f64 {
    if customer.avg_order_value <= 0.0 {
        return 0.0;
    }

    let diff = (product.price - customer.avg_order_value).abs();
    let normalized = (diff / customer.avg_order_value.max(PRICE_DIFF_FLOOR)).min(1.0);
    (1.0 - normalized).clamp(0.0, 1.0)
}

/// Rating scaled to [0, 1], defaulting unrated products to 3.0 stars.
pub fn quality(product: &ProductRecord) -> f64 {
    product.rating.unwrap_or(DEFAULT_PRODUCT_RATING) / 5.0
}
