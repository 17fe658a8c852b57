use async_trait::async_trait;
use shopsense_core::chrono::{DateTime, Utc};
use shopsense_core::domain::customer::CustomerId;
use shopsense_core::domain::product::{ProductId, ProductRecord};
use shopsense_core::domain::recommendation::LoggedRecommendation;
use sqlx::{sqlite::SqliteRow, Row};

use super::{product::product_from_row, RecommendationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationRepository for SqlRecommendationRepository {
    async fn log(&self, entry: LoggedRecommendation) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO recommendations (customer_id, product_id, score, recommended_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&entry.customer_id.0)
        .bind(&entry.product_id.0)
        .bind(entry.score)
        .bind(entry.recommended_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<(ProductRecord, LoggedRecommendation)>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.product_id, p.category, p.subcategory, p.price, p.brand,
                p.product_rating, p.sentiment_score, p.created_at, p.updated_at,
                r.customer_id AS rec_customer_id, r.score AS rec_score,
                r.recommended_at AS rec_recommended_at
            FROM recommendations r
            JOIN products p ON p.product_id = r.product_id
            WHERE r.customer_id = ?
            ORDER BY r.recommended_at DESC, r.id DESC
            LIMIT ?
            "#,
        )
        .bind(&customer_id.0)
        .bind(limit.clamp(1, 500) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let product = product_from_row(row)?;
                let entry = logged_recommendation_from_row(row, &product.id)?;
                Ok((product, entry))
            })
            .collect()
    }

    async fn co_recommended_products(
        &self,
        customer_ids: &[CustomerId],
        limit: usize,
    ) -> Result<Vec<(ProductRecord, u32)>, RepositoryError> {
        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; customer_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT
                p.product_id, p.category, p.subcategory, p.price, p.brand,
                p.product_rating, p.sentiment_score, p.created_at, p.updated_at,
                COUNT(DISTINCT r.customer_id) AS recommendation_count
            FROM recommendations r
            JOIN products p ON p.product_id = r.product_id
            WHERE r.customer_id IN ({placeholders})
            GROUP BY p.product_id
            ORDER BY recommendation_count DESC, p.product_rating DESC, p.product_id ASC
            LIMIT ?
            "#
        );

        let mut query = sqlx::query(&sql);
        for id in customer_ids {
            query = query.bind(&id.0);
        }
        let rows = query.bind(limit.clamp(1, 500) as i64).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let product = product_from_row(row)?;
                let count: i64 = row.try_get("recommendation_count")?;
                Ok((product, count.max(0) as u32))
            })
            .collect()
    }
}

fn logged_recommendation_from_row(
    row: &SqliteRow,
    product_id: &ProductId,
) -> Result<LoggedRecommendation, RepositoryError> {
    Ok(LoggedRecommendation {
        customer_id: CustomerId(row.try_get("rec_customer_id")?),
        product_id: product_id.clone(),
        score: row.try_get("rec_score")?,
        recommended_at: parse_rfc3339(
            "recommendation recommended_at",
            &row.try_get::<String, _>("rec_recommended_at")?,
        )?,
    })
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

#[cfg(test)]
mod tests {
    use shopsense_core::chrono::{DateTime, Utc};
    use shopsense_core::domain::customer::CustomerId;
    use shopsense_core::domain::product::{ProductId, ProductRecord};
    use shopsense_core::domain::recommendation::LoggedRecommendation;

    use super::{RecommendationRepository, SqlRecommendationRepository};
    use crate::repositories::{ProductRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    type TestResult<T> = Result<T, String>;

    fn product(id: &str, rating: f64) -> TestResult<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId(id.to_string()),
            category: "Electronics".to_string(),
            subcategory: "Smartphone".to_string(),
            price: 999.99,
            brand: "TechBrand".to_string(),
            rating: Some(rating),
            sentiment_score: Some(0.85),
            created_at: parse_ts("2026-01-01T00:00:00Z")?,
            updated_at: parse_ts("2026-01-01T00:00:00Z")?,
        })
    }

    async fn seed_customer(pool: &DbPool, id: &str) -> TestResult<()> {
        sqlx::query(
            "INSERT INTO customers (
                customer_id, age, gender, location, browsing_history, purchase_history,
                customer_segment, avg_order_value, created_at, updated_at
             ) VALUES (?, 30, NULL, 'Chicago', '[]', '[]',
                       'New Visitor', 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .execute(pool)
        .await
        .map_err(|error| format!("seed customer {id}: {error}"))?;
        Ok(())
    }

    fn entry(customer: &str, product: &str, score: f64, at: &str) -> TestResult<LoggedRecommendation> {
        Ok(LoggedRecommendation {
            customer_id: CustomerId(customer.to_string()),
            product_id: ProductId(product.to_string()),
            score,
            recommended_at: parse_ts(at)?,
        })
    }

    #[tokio::test]
    async fn log_is_append_only_and_recent_is_newest_first() -> TestResult<()> {
        let pool = setup_pool().await?;
        let products = SqlProductRepository::new(pool.clone());
        let repo = SqlRecommendationRepository::new(pool.clone());

        seed_customer(&pool, "C-1").await?;
        products
            .save(product("P-1", 4.5)?)
            .await
            .map_err(|error| format!("save product: {error}"))?;
        products
            .save(product("P-2", 4.1)?)
            .await
            .map_err(|error| format!("save product: {error}"))?;

        for e in [
            entry("C-1", "P-1", 0.80, "2026-03-01T09:00:00Z")?,
            entry("C-1", "P-2", 0.70, "2026-03-02T09:00:00Z")?,
            entry("C-1", "P-1", 0.90, "2026-03-03T09:00:00Z")?,
        ] {
            repo.log(e).await.map_err(|error| format!("log recommendation: {error}"))?;
        }

        let recent = repo
            .recent_for_customer(&CustomerId("C-1".to_string()), 10)
            .await
            .map_err(|error| format!("load recent: {error}"))?;

        if recent.len() != 3 {
            return Err(format!("log should be append-only, got {} rows", recent.len()));
        }
        let ids: Vec<&str> = recent.iter().map(|(p, _)| p.id.0.as_str()).collect();
        if ids != vec!["P-1", "P-2", "P-1"] {
            return Err(format!("recent ordering mismatch: {:?}", ids));
        }
        if recent[0].1.score != 0.90 {
            return Err(format!("newest entry should come first: {:?}", recent[0].1));
        }

        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn co_recommended_counts_distinct_customers_per_product() -> TestResult<()> {
        let pool = setup_pool().await?;
        let products = SqlProductRepository::new(pool.clone());
        let repo = SqlRecommendationRepository::new(pool.clone());

        for id in ["C-A", "C-B", "C-OTHER"] {
            seed_customer(&pool, id).await?;
        }
        products
            .save(product("P-SHARED", 4.0)?)
            .await
            .map_err(|error| format!("save product: {error}"))?;
        products
            .save(product("P-SOLO", 4.9)?)
            .await
            .map_err(|error| format!("save product: {error}"))?;
        products
            .save(product("P-ELSEWHERE", 4.8)?)
            .await
            .map_err(|error| format!("save product: {error}"))?;

        for e in [
            entry("C-A", "P-SHARED", 0.9, "2026-03-01T09:00:00Z")?,
            entry("C-B", "P-SHARED", 0.8, "2026-03-01T10:00:00Z")?,
            // second recommendation from the same customer must not inflate the count
            entry("C-A", "P-SHARED", 0.7, "2026-03-02T09:00:00Z")?,
            entry("C-A", "P-SOLO", 0.6, "2026-03-01T09:00:00Z")?,
            entry("C-OTHER", "P-ELSEWHERE", 0.9, "2026-03-01T09:00:00Z")?,
        ] {
            repo.log(e).await.map_err(|error| format!("log recommendation: {error}"))?;
        }

        let pool_ids =
            vec![CustomerId("C-A".to_string()), CustomerId("C-B".to_string())];
        let co_recommended = repo
            .co_recommended_products(&pool_ids, 20)
            .await
            .map_err(|error| format!("load co-recommended: {error}"))?;

        let summary: Vec<(&str, u32)> =
            co_recommended.iter().map(|(p, count)| (p.id.0.as_str(), *count)).collect();
        if summary != vec![("P-SHARED", 2), ("P-SOLO", 1)] {
            return Err(format!("co-recommendation counts mismatch: {:?}", summary));
        }

        let none = repo
            .co_recommended_products(&[], 20)
            .await
            .map_err(|error| format!("load empty co-recommended: {error}"))?;
        if !none.is_empty() {
            return Err("empty customer list should yield no products".to_string());
        }

        pool.close().await;
        Ok(())
    }

    async fn setup_pool() -> TestResult<DbPool> {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .map_err(|error| format!("connect test pool: {error}"))?;
        migrations::run_pending(&pool).await.map_err(|error| format!("run migrations: {error}"))?;
        Ok(pool)
    }

    fn parse_ts(value: &str) -> TestResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|error| format!("parse rfc3339 timestamp `{value}`: {error}"))
    }
}
