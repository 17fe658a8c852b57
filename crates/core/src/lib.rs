pub mod config;
pub mod domain;
pub mod errors;
pub mod ranking;

pub use chrono;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::{CustomerId, CustomerProfile};
pub use domain::memory::{MemoryKind, MemoryRecord};
pub use domain::product::{CategoryStats, ProductId, ProductRecord};
pub use domain::recommendation::{
    LoggedRecommendation, RecommendationContext, RecommendationOutcome, RecommendationSet,
    RecommendedProduct,
};
pub use errors::DomainError;
pub use ranking::engine::{RankingEngine, ScoredCandidate};
pub use ranking::scoring::{Jitter, ScoreCalculator, ScoringWeights};
