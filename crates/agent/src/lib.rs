//! Agents for the shopsense recommendation pipeline: a degraded-mode LLM
//! client, the recommendation ranker, and the customer / product /
//! coordination analysis flows built on top of it.

pub mod coordination;
pub mod customer;
pub mod json;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod product;
pub mod prompts;
pub mod recommendation;

use thiserror::Error;

use shopsense_db::repositories::RepositoryError;

/// Infrastructure failures inside an agent operation. Business outcomes
/// (customer not found, empty candidate pool, generation failure) are
/// modeled as outcome values, not errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub use coordination::CoordinationAgent;
pub use customer::{CustomerAgent, CustomerAnalysis};
pub use llm::{ChatMessage, GenerateOptions, LlmClient, RetryPolicy, Sleep, TokioSleep};
pub use memory::AgentMemory;
pub use ollama::{OllamaClient, PreflightStatus};
pub use product::{ProductAgent, ProductAnalysis};
pub use recommendation::RecommendationAgent;
