use async_trait::async_trait;
use shopsense_core::chrono::{DateTime, Utc};
use shopsense_core::domain::customer::{CustomerId, CustomerProfile};
use sqlx::{sqlite::SqliteRow, Row};

use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                customer_id, age, gender, location, browsing_history,
                purchase_history, customer_segment, avg_order_value,
                created_at, updated_at
            FROM customers
            WHERE customer_id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| customer_from_row(&value)).transpose()
    }

    async fn save(&self, customer: CustomerProfile) -> Result<(), RepositoryError> {
        let browsing = encode_history("browsing_history", &customer.browsing_history)?;
        let purchases = encode_history("purchase_history", &customer.purchase_history)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                customer_id, age, gender, location, browsing_history,
                purchase_history, customer_segment, avg_order_value,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(customer_id) DO UPDATE SET
                age = excluded.age,
                gender = excluded.gender,
                location = excluded.location,
                browsing_history = excluded.browsing_history,
                purchase_history = excluded.purchase_history,
                customer_segment = excluded.customer_segment,
                avg_order_value = excluded.avg_order_value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&customer.id.0)
        .bind(customer.age)
        .bind(customer.gender.as_deref())
        .bind(&customer.location)
        .bind(browsing)
        .bind(purchases)
        .bind(&customer.segment)
        .bind(customer.avg_order_value)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_similar(
        &self,
        customer: &CustomerProfile,
        max_age_gap: i64,
        limit: usize,
    ) -> Result<Vec<CustomerProfile>, RepositoryError> {
        let limit = limit.clamp(1, 100) as i64;

        let rows = sqlx::query(
            r#"
            SELECT
                customer_id, age, gender, location, browsing_history,
                purchase_history, customer_segment, avg_order_value,
                created_at, updated_at
            FROM customers
            WHERE customer_segment = ?
              AND location = ?
              AND ABS(age - ?) <= ?
              AND customer_id != ?
            ORDER BY avg_order_value DESC, customer_id ASC
            LIMIT ?
            "#,
        )
        .bind(&customer.segment)
        .bind(&customer.location)
        .bind(customer.age)
        .bind(max_age_gap)
        .bind(&customer.id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(customer_from_row).collect()
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<CustomerProfile, RepositoryError> {
    Ok(CustomerProfile {
        id: CustomerId(row.try_get("customer_id")?),
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        location: row.try_get("location")?,
        browsing_history: decode_history(
            "browsing_history",
            &row.try_get::<String, _>("browsing_history")?,
        )?,
        purchase_history: decode_history(
            "purchase_history",
            &row.try_get::<String, _>("purchase_history")?,
        )?,
        segment: row.try_get("customer_segment")?,
        avg_order_value: row.try_get("avg_order_value")?,
        created_at: parse_rfc3339("customer created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339("customer updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}

fn decode_history(field: &str, raw: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(raw).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} JSON '{}': {}", field, raw, err))
    })
}

fn encode_history(field: &str, history: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(history)
        .map_err(|err| RepositoryError::Decode(format!("could not encode {}: {}", field, err)))
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

#[cfg(test)]
mod tests {
    use shopsense_core::chrono::{DateTime, Utc};
    use shopsense_core::domain::customer::{CustomerId, CustomerProfile};

    use super::{CustomerRepository, SqlCustomerRepository};
    use crate::repositories::RepositoryError;
    use crate::{connect_with_settings, migrations, DbPool};

    type TestResult<T> = Result<T, String>;

    fn profile(
        id: &str,
        age: i64,
        location: &str,
        segment: &str,
        avg_order_value: f64,
    ) -> TestResult<CustomerProfile> {
        Ok(CustomerProfile {
            id: CustomerId(id.to_string()),
            age,
            gender: Some("Female".to_string()),
            location: location.to_string(),
            browsing_history: vec!["Electronics".to_string(), "Books".to_string()],
            purchase_history: vec!["Smartphone".to_string()],
            segment: segment.to_string(),
            avg_order_value,
            created_at: parse_ts("2026-03-01T08:00:00Z")?,
            updated_at: parse_ts("2026-03-01T08:00:00Z")?,
        })
    }

    #[tokio::test]
    async fn sql_customer_repo_round_trips_profiles_with_history_json() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlCustomerRepository::new(pool.clone());

        let original = profile("C-100", 28, "New York", "New Visitor", 1500.0)?;
        repo.save(original.clone()).await.map_err(|error| format!("save customer: {error}"))?;

        let found = repo
            .find_by_id(&original.id)
            .await
            .map_err(|error| format!("load customer: {error}"))?;
        let found = found.ok_or_else(|| "customer exists".to_string())?;
        if found != original {
            return Err(format!("round-trip mismatch: {:?} != {:?}", found, original));
        }

        let updated = CustomerProfile {
            purchase_history: vec!["Smartphone".to_string(), "Jeans".to_string()],
            avg_order_value: 1800.0,
            ..original.clone()
        };
        repo.save(updated.clone()).await.map_err(|error| format!("update customer: {error}"))?;

        let after_update = repo
            .find_by_id(&original.id)
            .await
            .map_err(|error| format!("reload customer: {error}"))?
            .ok_or_else(|| "customer still exists".to_string())?;
        if after_update.purchase_history != updated.purchase_history {
            return Err("upsert should replace purchase history".to_string());
        }
        if after_update.avg_order_value != 1800.0 {
            return Err("upsert should replace avg_order_value".to_string());
        }

        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn find_similar_matches_segment_location_and_age_band() -> TestResult<()> {
        let pool = setup_pool().await?;
        let repo = SqlCustomerRepository::new(pool.clone());

        let subject = profile("C-SUBJ", 35, "Chicago", "Frequent Buyer", 2000.0)?;
        let close_in_age = profile("C-NEAR", 38, "Chicago", "Frequent Buyer", 2400.0)?;
        let richer = profile("C-RICH", 33, "Chicago", "Frequent Buyer", 5000.0)?;
        let too_old = profile("C-OLD", 45, "Chicago", "Frequent Buyer", 9000.0)?;
        let wrong_city = profile("C-CITY", 35, "Boston", "Frequent Buyer", 2100.0)?;
        let wrong_segment = profile("C-SEG", 35, "Chicago", "New Visitor", 2100.0)?;

        for customer in [&subject, &close_in_age, &richer, &too_old, &wrong_city, &wrong_segment] {
            repo.save((*customer).clone())
                .await
                .map_err(|error| format!("save fixture customer: {error}"))?;
        }

        let similar = repo
            .find_similar(&subject, 5, 5)
            .await
            .map_err(|error| format!("find similar: {error}"))?;

        let ids: Vec<&str> = similar.iter().map(|c| c.id.0.as_str()).collect();
        if ids != vec!["C-RICH", "C-NEAR"] {
            return Err(format!("similar customers mismatch: {:?}", ids));
        }

        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn malformed_history_json_is_a_decode_error() -> TestResult<()> {
        let pool = setup_pool().await?;

        sqlx::query(
            "INSERT INTO customers (
                customer_id, age, gender, location, browsing_history, purchase_history,
                customer_segment, avg_order_value, created_at, updated_at
             ) VALUES ('C-BAD', 30, NULL, 'Chicago', 'not-json', '[]',
                       'New Visitor', 0, '2026-03-01T08:00:00Z', '2026-03-01T08:00:00Z')",
        )
        .execute(&pool)
        .await
        .map_err(|error| format!("insert raw row: {error}"))?;

        let repo = SqlCustomerRepository::new(pool.clone());
        let result = repo.find_by_id(&CustomerId("C-BAD".to_string())).await;

        match result {
            Err(RepositoryError::Decode(message)) => {
                if !message.contains("browsing_history") {
                    return Err(format!("decode error should name the field: {message}"));
                }
            }
            Err(other) => return Err(format!("expected decode error, got {other}")),
            Ok(_) => return Err("expected decode error, got a row".to_string()),
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
