//! # Report Repository
//!
//! Aggregate queries behind the admin dashboard.
//!
//! ## Windows
//! ```text
//!            month (date ≥ today − 30)
//!   ├──────────────────────────────────────────────┤
//!                             week (date ≥ today − 7)
//!                        ├─────────────────────────┤
//!                              daily series (7 days)
//!                          ├───┼───┼───┼───┼───┼───┤
//!                        today−6                 today
//! ```
//!
//! Dates are compared on the UTC calendar day of `sale_date`. The caller
//! passes `today` so reports are reproducible in tests.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::fetch_low_stock;
use crate::repository::sale::fetch_items;
use lacteos_core::{Money, Percentage, Product, Sale, SaleItemDetail};

const RECENT_SALES: i64 = 10;
const TOP_PRODUCTS: i64 = 10;
const LOW_STOCK_ROWS: i64 = 5;
const SERIES_DAYS: i64 = 7;
const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;

/// A recent sale with the creator's username and its lines.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentSale {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub sale: Sale,
    pub created_by_username: Option<String>,
    #[sqlx(skip)]
    pub items: Vec<SaleItemDetail>,
}

/// Count, revenue and profit over a date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct PeriodSummary {
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
}

/// All-time totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesTotals {
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub cost_cents: i64,
    /// Overall profit / cost, zero without cost.
    pub roi_bps: i64,
}

/// Per-sale averages, zero when there are no sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct SaleAverages {
    pub amount_cents: i64,
    pub profit_cents: i64,
    pub roi_bps: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub sale_count: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub today: NaiveDate,
    pub recent_sales: Vec<RecentSale>,
    pub totals: SalesTotals,
    pub week: PeriodSummary,
    pub month: PeriodSummary,
    pub today_summary: PeriodSummary,
    pub averages: SaleAverages,
    pub top_products: Vec<TopProduct>,
    /// Oldest first, one entry per day including days without sales.
    pub daily_sales: Vec<DailySales>,
    pub max_daily_revenue_cents: i64,
    pub low_stock: Vec<Product>,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the dashboard as of `today`. All queries read one snapshot.
    pub async fn dashboard(
        &self,
        today: NaiveDate,
        low_stock_threshold: i64,
    ) -> DbResult<DashboardReport> {
        debug!(%today, "Building dashboard report");

        let mut tx = self.pool.begin().await?;

        let recent_sales = recent_sales(&mut tx, RECENT_SALES).await?;
        let totals = totals(&mut tx).await?;
        let week = period_since(&mut tx, today - Duration::days(WEEK_DAYS)).await?;
        let month = period_since(&mut tx, today - Duration::days(MONTH_DAYS)).await?;
        let today_summary = period_on(&mut tx, today).await?;
        let averages = averages(&mut tx).await?;
        let top_products = top_products(&mut tx, TOP_PRODUCTS).await?;
        let daily_sales = daily_series(&mut tx, today, SERIES_DAYS).await?;
        let low_stock = fetch_low_stock(&mut tx, low_stock_threshold, LOW_STOCK_ROWS).await?;

        tx.commit().await?;

        let max_daily_revenue_cents = daily_sales
            .iter()
            .map(|d| d.revenue_cents)
            .max()
            .unwrap_or(0);

        Ok(DashboardReport {
            today,
            recent_sales,
            totals,
            week,
            month,
            today_summary,
            averages,
            top_products,
            daily_sales,
            max_daily_revenue_cents,
            low_stock,
        })
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

async fn recent_sales(conn: &mut SqliteConnection, limit: i64) -> DbResult<Vec<RecentSale>> {
    let mut sales = sqlx::query_as::<_, RecentSale>(
        r#"
        SELECT
            s.id, s.sale_date, s.customer_name, s.notes,
            s.total_amount_cents, s.total_cost_cents, s.total_profit_cents, s.roi_bps,
            s.created_by,
            u.username AS created_by_username
        FROM sales s
        LEFT JOIN users u ON u.id = s.created_by
        ORDER BY s.sale_date DESC, s.rowid DESC
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    for recent in &mut sales {
        recent.items = fetch_items(&mut *conn, &recent.sale.id).await?;
    }

    Ok(sales)
}

async fn totals(conn: &mut SqliteConnection) -> DbResult<SalesTotals> {
    let (sale_count, revenue_cents, profit_cents, cost_cents): (i64, i64, i64, i64) =
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(total_amount_cents), 0),
                COALESCE(SUM(total_profit_cents), 0),
                COALESCE(SUM(total_cost_cents), 0)
            FROM sales
            "#,
        )
        .fetch_one(conn)
        .await?;

    let roi = Percentage::ratio(Money::from_cents(profit_cents), Money::from_cents(cost_cents));

    Ok(SalesTotals {
        sale_count,
        revenue_cents,
        profit_cents,
        cost_cents,
        roi_bps: roi.bps(),
    })
}

async fn period_since(conn: &mut SqliteConnection, start: NaiveDate) -> DbResult<PeriodSummary> {
    let summary = sqlx::query_as::<_, PeriodSummary>(
        r#"
        SELECT
            COUNT(*) AS sale_count,
            COALESCE(SUM(total_amount_cents), 0) AS revenue_cents,
            COALESCE(SUM(total_profit_cents), 0) AS profit_cents
        FROM sales
        WHERE date(sale_date) >= ?1
        "#,
    )
    .bind(day_key(start))
    .fetch_one(conn)
    .await?;

    Ok(summary)
}

async fn period_on(conn: &mut SqliteConnection, day: NaiveDate) -> DbResult<PeriodSummary> {
    let summary = sqlx::query_as::<_, PeriodSummary>(
        r#"
        SELECT
            COUNT(*) AS sale_count,
            COALESCE(SUM(total_amount_cents), 0) AS revenue_cents,
            COALESCE(SUM(total_profit_cents), 0) AS profit_cents
        FROM sales
        WHERE date(sale_date) = ?1
        "#,
    )
    .bind(day_key(day))
    .fetch_one(conn)
    .await?;

    Ok(summary)
}

async fn averages(conn: &mut SqliteConnection) -> DbResult<SaleAverages> {
    let averages = sqlx::query_as::<_, SaleAverages>(
        r#"
        SELECT
            COALESCE(CAST(ROUND(AVG(total_amount_cents)) AS INTEGER), 0) AS amount_cents,
            COALESCE(CAST(ROUND(AVG(total_profit_cents)) AS INTEGER), 0) AS profit_cents,
            COALESCE(CAST(ROUND(AVG(roi_bps)) AS INTEGER), 0) AS roi_bps
        FROM sales
        "#,
    )
    .fetch_one(conn)
    .await?;

    Ok(averages)
}

async fn top_products(conn: &mut SqliteConnection, limit: i64) -> DbResult<Vec<TopProduct>> {
    let products = sqlx::query_as::<_, TopProduct>(
        r#"
        SELECT
            p.id AS product_id,
            p.name AS name,
            SUM(i.quantity) AS quantity,
            SUM(i.subtotal_cents) AS revenue_cents,
            SUM(i.profit_cents) AS profit_cents
        FROM sale_items i
        INNER JOIN products p ON p.id = i.product_id
        GROUP BY p.id, p.name
        ORDER BY quantity DESC, p.name
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(products)
}

/// One entry per day for the `days` days ending `today`, oldest first.
async fn daily_series(
    conn: &mut SqliteConnection,
    today: NaiveDate,
    days: i64,
) -> DbResult<Vec<DailySales>> {
    let start = today - Duration::days(days - 1);

    let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT
            date(sale_date) AS day,
            COUNT(*),
            COALESCE(SUM(total_amount_cents), 0),
            COALESCE(SUM(total_profit_cents), 0)
        FROM sales
        WHERE date(sale_date) >= ?1 AND date(sale_date) <= ?2
        GROUP BY day
        "#,
    )
    .bind(day_key(start))
    .bind(day_key(today))
    .fetch_all(conn)
    .await?;

    let series = (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let key = day_key(date);
            let (sale_count, revenue_cents, profit_cents) = rows
                .iter()
                .find(|(day, ..)| *day == key)
                .map(|(_, count, revenue, profit)| (*count, *revenue, *profit))
                .unwrap_or((0, 0, 0));
            DailySales {
                date,
                sale_count,
                revenue_cents,
                profit_cents,
            }
        })
        .collect();

    Ok(series)
}

// =============================================================================
// Tests
// =============================================================================
