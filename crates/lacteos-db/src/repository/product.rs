//! # Product Repository
//!
//! Database operations for the dairy catalog.
//!
//! ## Key Operations
//! - Listing in-stock products with category / text filters
//! - CRUD, with price changes logged to `price_history`
//! - Guarded stock adjustments (stock never drops below zero)
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-modify-write                                               │
//! │     SELECT stock ...; UPDATE products SET stock = 7                 │
//! │                                                                     │
//! │  ✅ Guarded delta                                                   │
//! │     UPDATE products SET stock = stock + ?2                          │
//! │     WHERE id = ?1 AND stock + ?2 >= 0                               │
//! │                                                                     │
//! │  0 rows affected → product missing or not enough units              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::price_history::insert_entry;
use crate::repository::{contains_pattern, new_id};
use lacteos_core::validation::{validate_optional_text, validate_product, MAX_REASON};
use lacteos_core::{CoreError, Product, ProductInput};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, category, description, price_cents, \
     cost_cents, stock, unit, expiration_date, created_at, updated_at";

/// Filters for the public product list. Blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
}

impl ProductFilter {
    fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products with stock > 0, ordered by name.
    pub async fn list_available(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(category = ?filter.category, search = ?filter.search, "Listing available products");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE stock > 0",
            PRODUCT_COLUMNS
        ));

        if let Some(category) = filter.category() {
            query
                .push(" AND category LIKE ")
                .push_bind(contains_pattern(category))
                .push(" ESCAPE '\\'");
        }

        if let Some(term) = filter.search() {
            let pattern = contains_pattern(term);
            query
                .push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        query.push(" ORDER BY name, id");

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Every product, in or out of stock, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name, id", PRODUCT_COLUMNS);

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Distinct category names, sorted.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }

    /// First `limit` in-stock products, for the home page.
    pub async fn featured(&self, limit: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE stock > 0 ORDER BY name, id LIMIT ?1",
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Creates a product from validated input.
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        let input = input.trimmed();
        validate_product(&input)?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: input.name,
            category: input.category,
            description: input.description,
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            stock: input.stock,
            unit: input.unit,
            expiration_date: input.expiration_date,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, description,
                price_cents, cost_cents, stock, unit,
                expiration_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(&product.unit)
        .bind(product.expiration_date)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Replaces a product's editable fields.
    ///
    /// When price or cost changes, a history row with the new values is
    /// appended in the same transaction.
    pub async fn update(
        &self,
        id: &str,
        input: &ProductInput,
        changed_by: Option<&str>,
        reason: &str,
    ) -> DbResult<Product> {
        let input = input.trimmed();
        validate_product(&input)?;
        validate_optional_text("reason", reason, MAX_REASON)?;

        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let current = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                description = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                stock = ?7,
                unit = ?8,
                expiration_date = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.cost_cents)
        .bind(input.stock)
        .bind(&input.unit)
        .bind(input.expiration_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let price_changed =
            current.price_cents != input.price_cents || current.cost_cents != input.cost_cents;
        if price_changed {
            insert_entry(
                &mut tx,
                id,
                input.price_cents,
                input.cost_cents,
                changed_by,
                reason.trim(),
            )
            .await?;
        }

        tx.commit().await?;

        info!(id = %id, price_changed, "Product updated");

        Ok(Product {
            id: current.id,
            name: input.name,
            category: input.category,
            description: input.description,
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            stock: input.stock,
            unit: input.unit,
            expiration_date: input.expiration_date,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Deletes a product.
    ///
    /// Products referenced by sale items are protected and fail with
    /// [`CoreError::ProductInUse`].
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if references > 0 {
            return Err(CoreError::ProductInUse(id.to_string()).into());
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Products with stock below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i64, limit: i64) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_low_stock(&mut conn, threshold, limit).await
    }

    /// Adds `delta` units (negative to remove). Refuses to go below zero.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        change_stock(&mut conn, id, delta).await?;
        fetch_product(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with the sale and report repositories)
// =============================================================================

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

pub(crate) async fn fetch_low_stock(
    conn: &mut SqliteConnection,
    threshold: i64,
    limit: i64,
) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE stock < ?1 ORDER BY stock ASC, name LIMIT ?2",
        PRODUCT_COLUMNS
    );

    let products = sqlx::query_as::<_, Product>(&sql)
        .bind(threshold)
        .bind(limit)
        .fetch_all(conn)
        .await?;

    Ok(products)
}

/// Applies a stock delta with the non-negative guard.
pub(crate) async fn change_stock(conn: &mut SqliteConnection, id: &str, delta: i64) -> DbResult<()> {
    debug!(id = %id, delta, "Updating stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_product(conn, id).await? {
            None => Err(DbError::not_found("Product", id)),
            Some(product) => Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: delta.saturating_neg(),
            }
            .into()),
        };
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
