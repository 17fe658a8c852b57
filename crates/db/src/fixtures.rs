//! Deterministic demo dataset used by `shopsense seed` and the doctor
//! command. The SQL fixture lives in config/fixtures/ so operators can
//! inspect exactly what gets loaded.

use sqlx::Row;

use crate::DbPool;

pub const DEMO_SEED_SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

pub const DEMO_CUSTOMER_COUNT: i64 = 3;
pub const DEMO_PRODUCT_COUNT: i64 = 6;
pub const DEMO_RECOMMENDATION_COUNT: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub customers: i64,
    pub products: i64,
    pub recommendations: i64,
    pub already_seeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationResult {
    pub customers: i64,
    pub products: i64,
    pub recommendations: i64,
}

impl VerificationResult {
    pub fn is_complete(&self) -> bool {
        self.customers >= DEMO_CUSTOMER_COUNT
            && self.products >= DEMO_PRODUCT_COUNT
            && self.recommendations >= DEMO_RECOMMENDATION_COUNT
    }
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Loads the demo dataset. A second load is a no-op so the
    /// append-only recommendation log is not duplicated.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, sqlx::Error> {
        let before = Self::verify(pool).await?;
        if before.customers > 0 {
            return Ok(SeedResult {
                customers: before.customers,
                products: before.products,
                recommendations: before.recommendations,
                already_seeded: true,
            });
        }

        sqlx::raw_sql(DEMO_SEED_SQL).execute(pool).await?;

        let after = Self::verify(pool).await?;
        Ok(SeedResult {
            customers: after.customers,
            products: after.products,
            recommendations: after.recommendations,
            already_seeded: false,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, sqlx::Error> {
        Ok(VerificationResult {
            customers: count(pool, "customers").await?,
            products: count(pool, "products").await?,
            recommendations: count(pool, "recommendations").await?,
        })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM recommendations").execute(pool).await?;
        sqlx::query("DELETE FROM interactions").execute(pool).await?;
        sqlx::query("DELETE FROM agent_memory").execute(pool).await?;
        sqlx::query("DELETE FROM customers").execute(pool).await?;
        sqlx::query("DELETE FROM products").execute(pool).await?;
        Ok(())
    }
}

async fn count(pool: &DbPool, table: &str) -> Result<i64, sqlx::Error> {
    // Table names come from the fixed list above, never from input.
    let row = sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
        .fetch_one(pool)
        .await?;
    row.try_get("count")
}
