use async_trait::async_trait;
use shopsense_core::chrono::{DateTime, Utc};
use shopsense_core::domain::product::{CategoryStats, ProductId, ProductRecord};
use sqlx::{sqlite::SqliteRow, Row};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

const PRICE_DISTANCE_SCALE: f64 = 5000.0;
const RATING_DISTANCE_SCALE: f64 = 5.0;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<ProductRecord>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at
            FROM products
            WHERE product_id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| product_from_row(&value)).transpose()
    }

    async fn save(&self, product: ProductRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                category = excluded.category,
                subcategory = excluded.subcategory,
                price = excluded.price,
                brand = excluded.brand,
                product_rating = excluded.product_rating,
                sentiment_score = excluded.sentiment_score,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id.0)
        .bind(&product.category)
        .bind(&product.subcategory)
        .bind(product.price)
        .bind(&product.brand)
        .bind(product.rating)
        .bind(product.sentiment_score)
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn top_rated(&self, limit: usize) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at
            FROM products
            ORDER BY product_rating DESC, product_id ASC
            LIMIT ?
            "#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn top_rated_in_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at
            FROM products
            WHERE category = ? COLLATE NOCASE
            ORDER BY product_rating DESC, product_id ASC
            LIMIT ?
            "#,
        )
        .bind(category)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn similar_to(
        &self,
        product: &ProductRecord,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at,
                ABS(price - ?) / ? + ABS(COALESCE(product_rating, 3.0) - ?) / ? AS distance
            FROM products
            WHERE category = ? COLLATE NOCASE
              AND product_id != ?
            ORDER BY distance ASC, product_id ASC
            LIMIT ?
            "#,
        )
        .bind(product.price)
        .bind(PRICE_DISTANCE_SCALE)
        .bind(product.rating.unwrap_or(3.0))
        .bind(RATING_DISTANCE_SCALE)
        .bind(&product.category)
        .bind(&product.id.0)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn in_other_categories(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id, category, subcategory, price, brand,
                product_rating, sentiment_score, created_at, updated_at
            FROM products
            WHERE category != ? COLLATE NOCASE
            ORDER BY product_rating DESC, product_id ASC
            LIMIT ?
            "#,
        )
        .bind(category)
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn trending(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    r#"
                    SELECT
                        product_id, category, subcategory, price, brand,
                        product_rating, sentiment_score, created_at, updated_at
                    FROM products
                    WHERE category = ? COLLATE NOCASE
                    ORDER BY product_rating DESC, created_at DESC, product_id ASC
                    LIMIT ?
                    "#,
                )
                .bind(category)
                .bind(clamp_limit(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT
                        product_id, category, subcategory, price, brand,
                        product_rating, sentiment_score, created_at, updated_at
                    FROM products
                    ORDER BY product_rating DESC, created_at DESC, product_id ASC
                    LIMIT ?
                    "#,
                )
                .bind(clamp_limit(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(product_from_row).collect()
    }

    async fn category_stats(
        &self,
        category: &str,
    ) -> Result<Option<CategoryStats>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS product_count,
                AVG(price) AS avg_price,
                MIN(price) AS min_price,
                MAX(price) AS max_price,
                AVG(product_rating) AS avg_rating
            FROM products
            WHERE category = ? COLLATE NOCASE
            "#,
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        let product_count: i64 = row.try_get("product_count")?;
        if product_count == 0 {
            return Ok(None);
        }

        let subcategory_rows = sqlx::query(
            r#"
            SELECT DISTINCT subcategory
            FROM products
            WHERE category = ? COLLATE NOCASE
            ORDER BY subcategory ASC
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        let subcategories = subcategory_rows
            .iter()
            .map(|value| value.try_get::<String, _>("subcategory"))
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(CategoryStats {
            category: category.to_string(),
            product_count,
            avg_price: row.try_get("avg_price")?,
            min_price: row.try_get("min_price")?,
            max_price: row.try_get("max_price")?,
            avg_rating: row.try_get("avg_rating")?,
            subcategories,
        }))
    }
}

fn clamp_limit(limit: usize) -> i64 {
    limit.clamp(1, 500) as i64
}

pub(crate) fn product_from_row(row: &SqliteRow) -> Result<ProductRecord, RepositoryError> {
    Ok(ProductRecord {
        id: ProductId(row.try_get("product_id")?),
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        price: row.try_get("price")?,
        brand: row.try_get("brand")?,
        rating: row.try_get("product_rating")?,
        sentiment_score: row.try_get("sentiment_score")?,
        created_at: parse_rfc3339("product created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339("product updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}
