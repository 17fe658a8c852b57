use async_trait::async_trait;
use thiserror::Error;

use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use shopsense_core::domain::memory::{MemoryKind, MemoryRecord};
use shopsense_core::domain::product::{CategoryStats, ProductId, ProductRecord};
use shopsense_core::domain::recommendation::LoggedRecommendation;

pub mod agent_memory;
pub mod customer;
pub mod memory;
pub mod product;
pub mod recommendation;

pub use agent_memory::SqlAgentMemoryRepository;
pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryAgentMemoryRepository, InMemoryCustomerRepository, InMemoryProductRepository,
    InMemoryRecommendationRepository,
};
pub use product::SqlProductRepository;
pub use recommendation::SqlRecommendationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId)
        -> Result<Option<CustomerProfile>, RepositoryError>;

    async fn save(&self, customer: CustomerProfile) -> Result<(), RepositoryError>;

    /// Customers in the same segment and location whose age is within
    /// `max_age_gap` years, highest spenders first. Excludes the customer
    /// itself.
    async fn find_similar(
        &self,
        customer: &CustomerProfile,
        max_age_gap: i64,
        limit: usize,
    ) -> Result<Vec<CustomerProfile>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<ProductRecord>, RepositoryError>;

    async fn save(&self, product: ProductRecord) -> Result<(), RepositoryError>;

    /// Highest-rated products across the catalog, with a deterministic
    /// id tiebreak for equal ratings.
    async fn top_rated(&self, limit: usize) -> Result<Vec<ProductRecord>, RepositoryError>;

    async fn top_rated_in_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError>;

    /// Products in the same category ordered by closeness in price and
    /// rating, excluding the product itself.
    async fn similar_to(
        &self,
        product: &ProductRecord,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError>;

    /// Top-rated products from every other category.
    async fn in_other_categories(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError>;

    /// Top-rated catalog products, newest first on rating ties, optionally
    /// scoped to one category.
    async fn trending(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError>;

    async fn category_stats(
        &self,
        category: &str,
    ) -> Result<Option<CategoryStats>, RepositoryError>;
}

#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Append one entry to the recommendation log. The log is append-only;
    /// re-recommending a product produces a new row.
    async fn log(&self, entry: LoggedRecommendation) -> Result<(), RepositoryError>;

    async fn recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<(ProductRecord, LoggedRecommendation)>, RepositoryError>;

    /// Distinct products recommended to any of the given customers, with the
    /// number of those customers each product was recommended to. Most
    /// co-recommended first, then highest rated.
    async fn co_recommended_products(
        &self,
        customer_ids: &[CustomerId],
        limit: usize,
    ) -> Result<Vec<(ProductRecord, u32)>, RepositoryError>;
}

#[async_trait]
pub trait AgentMemoryRepository: Send + Sync {
    async fn store(&self, record: MemoryRecord) -> Result<(), RepositoryError>;

    async fn recall(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RepositoryError>;
}
