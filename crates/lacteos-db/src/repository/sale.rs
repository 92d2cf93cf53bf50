//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Purchase Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       record_sale(draft)                                │
//! │                                                                         │
//! │  no positive quantity? ──► EmptyPurchase                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT sale (zero totals)                                         │
//! │   ├── for each line:                                                    │
//! │   │     unknown product / qty ≤ 0  → skip                              │
//! │   │     qty > stock                → clamp + warning                    │
//! │   │     fitted qty > 0             → INSERT item, stock -= qty          │
//! │   ├── nothing added? ──► ROLLBACK, NoValidItems                         │
//! │   └── recalculate totals from items                                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are never written directly; every item insert is followed by
//! [`recalculate`] in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::product::{change_stock, fetch_product};
use lacteos_core::pricing::{effective_unit_cost, fit_to_stock, stock_warning, LineAmounts, SaleTotals};
use lacteos_core::validation::{validate_optional_text, validate_quantity, MAX_CUSTOMER_NAME};
use lacteos_core::{
    CoreError, Money, Sale, SaleDraft, SaleItem, SaleItemDetail, SaleReceipt,
};

const SALE_COLUMNS: &str = "id, sale_date, customer_name, notes, total_amount_cents, \
     total_cost_cents, total_profit_cents, roi_bps, created_by";

/// Header of a sale created without going through the purchase flow.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub sale_date: DateTime<Utc>,
    pub customer_name: String,
    pub notes: String,
    pub created_by: Option<String>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a purchase in one transaction. See the module docs.
    pub async fn record_sale(
        &self,
        draft: &SaleDraft,
        created_by: Option<&str>,
    ) -> DbResult<SaleReceipt> {
        if !draft.has_positive_line() {
            return Err(CoreError::EmptyPurchase.into());
        }
        validate_optional_text("customer_name", &draft.customer_name, MAX_CUSTOMER_NAME)?;

        let mut tx = self.pool.begin().await?;

        let sale = insert_sale(
            &mut tx,
            &NewSale {
                sale_date: Utc::now(),
                customer_name: draft.customer_name.trim().to_string(),
                notes: draft.notes.trim().to_string(),
                created_by: created_by.map(str::to_string),
            },
        )
        .await?;

        debug!(sale_id = %sale.id, lines = draft.items.len(), "Recording sale");

        let mut warnings = Vec::new();
        let mut added = 0usize;

        for line in &draft.items {
            if line.quantity <= 0 {
                continue;
            }

            let Some(product) = fetch_product(&mut tx, &line.product_id).await? else {
                debug!(product_id = %line.product_id, "Skipping unknown product");
                continue;
            };

            let fit = fit_to_stock(line.quantity, product.stock);
            if fit.adjusted {
                warnings.push(stock_warning(product.stock, &product.name));
            }
            if fit.quantity == 0 {
                continue;
            }

            let unit_cost = effective_unit_cost(product.price(), product.cost());
            insert_item(
                &mut tx,
                &sale.id,
                &product.id,
                fit.quantity,
                product.price(),
                unit_cost,
            )
            .await?;
            change_stock(&mut tx, &product.id, -fit.quantity).await?;
            added += 1;
        }

        if added == 0 {
            tx.rollback().await?;
            return Err(CoreError::NoValidItems.into());
        }

        recalculate(&mut tx, &sale.id).await?;
        let sale = fetch_sale(&mut tx, &sale.id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale.id))?;
        let items = fetch_items(&mut tx, &sale.id).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            items = items.len(),
            total_cents = sale.total_amount_cents,
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale,
            items,
            warnings,
        })
    }

    /// Inserts a sale header with zero totals.
    pub async fn create(&self, new_sale: &NewSale) -> DbResult<Sale> {
        validate_optional_text("customer_name", &new_sale.customer_name, MAX_CUSTOMER_NAME)?;
        let mut conn = self.pool.acquire().await?;
        insert_sale(&mut conn, new_sale).await
    }

    /// Adds a line to an existing sale and refreshes its totals.
    ///
    /// Stock is left untouched; this is the bookkeeping path used for
    /// imported or mock sales.
    pub async fn add_item(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Money,
        cost_price: Money,
    ) -> DbResult<SaleItem> {
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        if fetch_sale(&mut tx, sale_id).await?.is_none() {
            return Err(DbError::not_found("Sale", sale_id));
        }
        if fetch_product(&mut tx, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let item = insert_item(&mut tx, sale_id, product_id, quantity, unit_price, cost_price).await?;
        recalculate(&mut tx, sale_id).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Recomputes a sale's totals from its items.
    pub async fn recalculate_totals(&self, sale_id: &str) -> DbResult<SaleTotals> {
        let mut conn = self.pool.acquire().await?;
        recalculate(&mut conn, sale_id).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Sale> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Items of a sale with their product names.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItemDetail>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, sale_id).await
    }

    /// Sales recorded by one user, newest first.
    pub async fn list_by_creator(&self, user_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE created_by = ?1 ORDER BY sale_date DESC, rowid DESC",
            SALE_COLUMNS
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Deletes a sale; its items go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        info!(id = %id, "Sale deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);

    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(sale)
}

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItemDetail>> {
    let items = sqlx::query_as::<_, SaleItemDetail>(
        r#"
        SELECT
            i.id, i.sale_id, i.product_id, i.quantity,
            i.unit_price_cents, i.cost_price_cents,
            i.subtotal_cents, i.cost_subtotal_cents, i.profit_cents,
            p.name AS product_name
        FROM sale_items i
        INNER JOIN products p ON p.id = i.product_id
        WHERE i.sale_id = ?1
        ORDER BY i.rowid
        "#,
    )
    .bind(sale_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

async fn insert_sale(conn: &mut SqliteConnection, new_sale: &NewSale) -> DbResult<Sale> {
    let sale = Sale {
        id: new_id(),
        sale_date: new_sale.sale_date,
        customer_name: new_sale.customer_name.clone(),
        notes: new_sale.notes.clone(),
        total_amount_cents: 0,
        total_cost_cents: 0,
        total_profit_cents: 0,
        roi_bps: 0,
        created_by: new_sale.created_by.clone(),
    };

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_date, customer_name, notes,
            total_amount_cents, total_cost_cents, total_profit_cents, roi_bps,
            created_by
        ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, 0, ?5)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.sale_date)
    .bind(&sale.customer_name)
    .bind(&sale.notes)
    .bind(&sale.created_by)
    .execute(conn)
    .await?;

    Ok(sale)
}

/// Inserts a line with its derived amounts. Callers must recalculate the
/// parent sale afterwards.
async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product_id: &str,
    quantity: i64,
    unit_price: Money,
    cost_price: Money,
) -> DbResult<SaleItem> {
    let amounts = LineAmounts::compute(quantity, unit_price, cost_price)?;
    let item = SaleItem {
        id: new_id(),
        sale_id: sale_id.to_string(),
        product_id: product_id.to_string(),
        quantity,
        unit_price_cents: unit_price.cents(),
        cost_price_cents: cost_price.cents(),
        subtotal_cents: amounts.subtotal.cents(),
        cost_subtotal_cents: amounts.cost_subtotal.cents(),
        profit_cents: amounts.profit.cents(),
    };

    debug!(sale_id = %sale_id, product_id = %product_id, quantity, "Adding sale item");

    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, quantity,
            unit_price_cents, cost_price_cents,
            subtotal_cents, cost_subtotal_cents, profit_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.cost_price_cents)
    .bind(item.subtotal_cents)
    .bind(item.cost_subtotal_cents)
    .bind(item.profit_cents)
    .execute(conn)
    .await?;

    Ok(item)
}

async fn recalculate(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<SaleTotals> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT id, sale_id, product_id, quantity, unit_price_cents, cost_price_cents,
               subtotal_cents, cost_subtotal_cents, profit_cents
        FROM sale_items
        WHERE sale_id = ?1
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let totals = SaleTotals::from_items(&items)?;

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            total_amount_cents = ?2,
            total_cost_cents = ?3,
            total_profit_cents = ?4,
            roi_bps = ?5
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .bind(totals.total_amount.cents())
    .bind(totals.total_cost.cents())
    .bind(totals.total_profit.cents())
    .bind(totals.roi.bps())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", sale_id));
    }

    Ok(totals)
}

// =============================================================================
// Tests
// =============================================================================
