//! # Price History Repository
//!
//! Append-only log of product price and cost changes. Rows are written by
//! [`ProductRepository::update`](super::product::ProductRepository::update)
//! inside its transaction and read back newest first.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use lacteos_core::validation::{validate_optional_text, MAX_REASON};
use lacteos_core::PriceHistory;

#[derive(Debug, Clone)]
pub struct PriceHistoryRepository {
    pool: SqlitePool,
}

impl PriceHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceHistoryRepository { pool }
    }

    /// History of one product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<PriceHistory>> {
        let entries = sqlx::query_as::<_, PriceHistory>(
            r#"
            SELECT id, product_id, price_cents, cost_cents, changed_at, changed_by, reason
            FROM price_history
            WHERE product_id = ?1
            ORDER BY changed_at DESC, rowid DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Records a price point outside of a product edit (e.g. imports).
    pub async fn append(
        &self,
        product_id: &str,
        price_cents: i64,
        cost_cents: i64,
        changed_by: Option<&str>,
        reason: &str,
    ) -> DbResult<PriceHistory> {
        validate_optional_text("reason", reason, MAX_REASON)?;

        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, product_id, price_cents, cost_cents, changed_by, reason)
            .await
            .map_err(|e| match e {
                DbError::ForeignKeyViolation { .. } => DbError::not_found("Product", product_id),
                other => other,
            })
    }
}

pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    product_id: &str,
    price_cents: i64,
    cost_cents: i64,
    changed_by: Option<&str>,
    reason: &str,
) -> DbResult<PriceHistory> {
    let entry = PriceHistory {
        id: new_id(),
        product_id: product_id.to_string(),
        price_cents,
        cost_cents,
        changed_at: Utc::now(),
        changed_by: changed_by.map(str::to_string),
        reason: reason.to_string(),
    };

    debug!(product_id = %product_id, price_cents, cost_cents, "Recording price change");

    sqlx::query(
        r#"
        INSERT INTO price_history (
            id, product_id, price_cents, cost_cents, changed_at, changed_by, reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(entry.price_cents)
    .bind(entry.cost_cents)
    .bind(entry.changed_at)
    .bind(&entry.changed_by)
    .bind(&entry.reason)
    .execute(conn)
    .await?;

    Ok(entry)
}
