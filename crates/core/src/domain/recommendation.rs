use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use super::product::ProductId;

/// How a recommendation request is scoped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RecommendationContext {
    General,
    Category(String),
    Occasion(String),
    Season(String),
    SimilarCustomers,
}

/// One entry in a ranked recommendation list, flattened for responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub product_id: ProductId,
    pub category: String,
    pub subcategory: String,
    pub price: f64,
    pub brand: String,
    pub score: f64,
}

/// A completed recommendation response for one customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub customer_id: CustomerId,
    pub context: RecommendationContext,
    pub recommendations: Vec<RecommendedProduct>,
    pub explanation: String,
}

/// Business outcome of a recommendation request. Infrastructure failures
/// are reported separately as errors; these four cases are ordinary values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RecommendationOutcome {
    Ranked(RecommendationSet),
    CustomerNotFound { customer_id: CustomerId },
    NoCandidates { message: String },
    GenerationFailed { message: String },
}

impl RecommendationOutcome {
    pub fn as_ranked(&self) -> Option<&RecommendationSet> {
        match self {
            Self::Ranked(set) => Some(set),
            _ => None,
        }
    }
}

/// A row in the append-only recommendation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedRecommendation {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub score: f64,
    pub recommended_at: DateTime<Utc>,
}
