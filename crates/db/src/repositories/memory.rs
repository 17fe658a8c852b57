//! In-memory repository doubles for agent and ranking tests. Ordering
//! mirrors the SQL repositories so tests exercise the same semantics.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use shopsense_core::domain::memory::{MemoryKind, MemoryRecord};
use shopsense_core::domain::product::{CategoryStats, ProductId, ProductRecord};
use shopsense_core::domain::recommendation::LoggedRecommendation;

use super::{
    AgentMemoryRepository, CustomerRepository, ProductRepository, RecommendationRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, CustomerProfile>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        Ok(self.customers.read().await.get(&id.0).cloned())
    }

    async fn save(&self, customer: CustomerProfile) -> Result<(), RepositoryError> {
        self.customers.write().await.insert(customer.id.0.clone(), customer);
        Ok(())
    }

    async fn find_similar(
        &self,
        customer: &CustomerProfile,
        max_age_gap: i64,
        limit: usize,
    ) -> Result<Vec<CustomerProfile>, RepositoryError> {
        let mut matches: Vec<CustomerProfile> = self
            .customers
            .read()
            .await
            .values()
            .filter(|candidate| {
                candidate.id != customer.id
                    && candidate.segment == customer.segment
                    && candidate.location == customer.location
                    && (candidate.age - customer.age).abs() <= max_age_gap
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.avg_order_value
                .total_cmp(&a.avg_order_value)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        matches.truncate(limit.max(1));
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, ProductRecord>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn all(&self) -> Vec<ProductRecord> {
        self.products.read().await.values().cloned().collect()
    }
}

fn by_rating_desc(a: &ProductRecord, b: &ProductRecord) -> Ordering {
    // NULL ratings sort last, matching SQLite's DESC ordering.
    rating_key(b).total_cmp(&rating_key(a)).then_with(|| a.id.0.cmp(&b.id.0))
}

fn rating_key(product: &ProductRecord) -> f64 {
    product.rating.unwrap_or(f64::NEG_INFINITY)
}

fn same_category(product: &ProductRecord, category: &str) -> bool {
    product.category.eq_ignore_ascii_case(category)
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<ProductRecord>, RepositoryError> {
        Ok(self.products.read().await.get(&id.0).cloned())
    }

    async fn save(&self, product: ProductRecord) -> Result<(), RepositoryError> {
        self.products.write().await.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn top_rated(&self, limit: usize) -> Result<Vec<ProductRecord>, RepositoryError> {
        let mut products = self.all().await;
        products.sort_by(by_rating_desc);
        products.truncate(limit.max(1));
        Ok(products)
    }

    async fn top_rated_in_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let mut products: Vec<ProductRecord> =
            self.all().await.into_iter().filter(|p| same_category(p, category)).collect();
        products.sort_by(by_rating_desc);
        products.truncate(limit.max(1));
        Ok(products)
    }

    async fn similar_to(
        &self,
        product: &ProductRecord,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let anchor_rating = product.rating.unwrap_or(3.0);
        let mut candidates: Vec<ProductRecord> = self
            .all()
            .await
            .into_iter()
            .filter(|p| p.id != product.id && same_category(p, &product.category))
            .collect();

        let distance = |candidate: &ProductRecord| {
            (candidate.price - product.price).abs() / 5000.0
                + (candidate.rating.unwrap_or(3.0) - anchor_rating).abs() / 5.0
        };
        candidates.sort_by(|a, b| {
            distance(a).total_cmp(&distance(b)).then_with(|| a.id.0.cmp(&b.id.0))
        });
        candidates.truncate(limit.max(1));
        Ok(candidates)
    }

    async fn in_other_categories(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let mut products: Vec<ProductRecord> =
            self.all().await.into_iter().filter(|p| !same_category(p, category)).collect();
        products.sort_by(by_rating_desc);
        products.truncate(limit.max(1));
        Ok(products)
    }

    async fn trending(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let mut products: Vec<ProductRecord> = self
            .all()
            .await
            .into_iter()
            .filter(|p| category.map(|c| same_category(p, c)).unwrap_or(true))
            .collect();
        products.sort_by(|a, b| {
            rating_key(b)
                .total_cmp(&rating_key(a))
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        products.truncate(limit.max(1));
        Ok(products)
    }

    async fn category_stats(
        &self,
        category: &str,
    ) -> Result<Option<CategoryStats>, RepositoryError> {
        let products: Vec<ProductRecord> =
            self.all().await.into_iter().filter(|p| same_category(p, category)).collect();
        if products.is_empty() {
            return Ok(None);
        }

        let count = products.len() as f64;
        let avg_price = products.iter().map(|p| p.price).sum::<f64>() / count;
        let min_price = products.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max_price = products.iter().map(|p| p.price).fold(f64::NEG_INFINITY, f64::max);
        let rated: Vec<f64> = products.iter().filter_map(|p| p.rating).collect();
        let avg_rating = if rated.is_empty() {
            None
        } else {
            Some(rated.iter().sum::<f64>() / rated.len() as f64)
        };
        let mut subcategories: Vec<String> =
            products.iter().map(|p| p.subcategory.clone()).collect();
        subcategories.sort();
        subcategories.dedup();

        Ok(Some(CategoryStats {
            category: category.to_string(),
            product_count: products.len() as i64,
            avg_price,
            min_price,
            max_price,
            avg_rating,
            subcategories,
        }))
    }
}

/// Recommendation log double. Joins against a shared product repository the
/// same way the SQL repository joins against the products table.
pub struct InMemoryRecommendationRepository {
    products: Arc<InMemoryProductRepository>,
    entries: RwLock<Vec<LoggedRecommendation>>,
}

impl InMemoryRecommendationRepository {
    pub fn new(products: Arc<InMemoryProductRepository>) -> Self {
        Self { products, entries: RwLock::new(Vec::new()) }
    }
}

#[async_trait]
impl RecommendationRepository for InMemoryRecommendationRepository {
    async fn log(&self, entry: LoggedRecommendation) -> Result<(), RepositoryError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<(ProductRecord, LoggedRecommendation)>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut indexed: Vec<(usize, LoggedRecommendation)> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.customer_id == *customer_id)
            .map(|(position, entry)| (position, entry.clone()))
            .collect();
        drop(entries);

        // Newest first; insertion order breaks timestamp ties like the
        // autoincrement id does in SQL.
        indexed.sort_by(|a, b| {
            b.1.recommended_at.cmp(&a.1.recommended_at).then_with(|| b.0.cmp(&a.0))
        });
        indexed.truncate(limit.max(1));

        let mut joined = Vec::with_capacity(indexed.len());
        for (_, entry) in indexed {
            if let Some(product) = self.products.find_by_id(&entry.product_id).await? {
                joined.push((product, entry));
            }
        }
        Ok(joined)
    }

    async fn co_recommended_products(
        &self,
        customer_ids: &[CustomerId],
        limit: usize,
    ) -> Result<Vec<(ProductRecord, u32)>, RepositoryError> {
        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().await;
        let mut customers_per_product: HashMap<String, Vec<String>> = HashMap::new();
        for entry in entries.iter() {
            if customer_ids.contains(&entry.customer_id) {
                let seen = customers_per_product.entry(entry.product_id.0.clone()).or_default();
                if !seen.contains(&entry.customer_id.0) {
                    seen.push(entry.customer_id.0.clone());
                }
            }
        }
        drop(entries);

        let mut counted = Vec::with_capacity(customers_per_product.len());
        for (product_id, customers) in customers_per_product {
            if let Some(product) = self.products.find_by_id(&ProductId(product_id)).await? {
                counted.push((product, customers.len() as u32));
            }
        }
        counted.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| rating_key(&b.0).total_cmp(&rating_key(&a.0)))
                .then_with(|| a.0.id.0.cmp(&b.0.id.0))
        });
        counted.truncate(limit.max(1));
        Ok(counted)
    }
}

#[derive(Default)]
pub struct InMemoryAgentMemoryRepository {
    memories: RwLock<HashMap<(String, String, String), MemoryRecord>>,
}

impl InMemoryAgentMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentMemoryRepository for InMemoryAgentMemoryRepository {
    async fn store(&self, record: MemoryRecord) -> Result<(), RepositoryError> {
        let key = (
            record.agent_id.clone(),
            record.kind.as_str().to_string(),
            record.key.clone(),
        );
        self.memories.write().await.insert(key, record);
        Ok(())
    }

    async fn recall(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, RepositoryError> {
        let mut matches: Vec<MemoryRecord> = self
            .memories
            .read()
            .await
            .values()
            .filter(|memory| memory.agent_id == agent_id && memory.kind == kind)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| a.key.cmp(&b.key))
        });
        matches.truncate(limit.max(1));
        Ok(matches)
    }
}
