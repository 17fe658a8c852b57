use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),
}
