//! Recommendation ranking
//!
//! Deterministic linear scoring over customer profiles and product records,
//! with threshold filtering, stable descending sort, and truncation.

pub mod engine;
pub mod scoring;

pub use engine::{RankingEngine, ScoredCandidate};
pub use scoring::{Jitter, ScoreCalculator, ScoringWeights};

/// Default scoring weights
pub const DEFAULT_WEIGHTS: ScoringWeights =
    ScoringWeights { category_affinity: 0.40, price_fit: 0.30, quality: 0.30 };

/// Admission threshold: candidates scoring below this are dropped before sorting
pub const MIN_RECOMMENDATION_SCORE: f64 = 0.30;

/// Default number of recommendations to return
pub const DEFAULT_TOP_N: usize = 5;

/// Half-width of the uniform jitter applied to each score
pub const JITTER_RANGE: f64 = 0.05;

/// Rating assumed for products with no rating on file
pub const DEFAULT_PRODUCT_RATING: f64 = 3.0;

/// Price differences are normalized against at least this order value
pub const PRICE_DIFF_FLOOR: f64 = 1000.0;

/// Candidate pool sizes per ranking variant
pub const GENERAL_CANDIDATE_POOL: usize = 100;
pub const CATEGORY_CANDIDATE_POOL: usize = 50;
pub const CURATED_CANDIDATE_POOL: usize = 50;
pub const CURATED_PROMPT_PRODUCTS: usize = 20;
pub const SIMILAR_CANDIDATE_POOL: usize = 20;

/// Similar-customer lookup and boost parameters
pub const SIMILAR_CUSTOMER_LIMIT: usize = 5;
pub const SIMILAR_CUSTOMER_MAX_AGE_GAP: i64 = 5;
pub const MAX_SIMILAR_BOOST: f64 = 0.30;
pub const SIMILAR_BOOST_STEP: f64 = 0.10;
