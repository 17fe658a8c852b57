use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub category: String,
    pub subcategory: String,
    pub price: f64,
    pub brand: String,
    pub rating: Option<f64>,
    pub sentiment_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate statistics for a single catalog category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub product_count: i64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// None when no product in the category carries a rating.
    pub avg_rating: Option<f64>,
    pub subcategories: Vec<String>,
}
