//! # lacteos-core: Pure Business Logic for Lacteos
//!
//! Domain types and calculations for the dairy shop back office. Everything
//! here is deterministic and free of I/O; the database and HTTP layers build
//! on top of it.
//!
//! ## Where It Sits
//! ```text
//!   apps/web ──► lacteos-db ──► lacteos-core
//!   (axum)       (SQLite)       types, money, pricing, validation
//! ```
//!
//! Storage computes nothing on its own: every derived amount it writes
//! (line subtotal, cost subtotal, profit, sale totals, ROI) comes from
//! [`pricing`].
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Sale, SaleItem, UserProfile, ...)
//! - [`money`] - Integer money and basis-point percentages
//! - [`pricing`] - Line item math, sale totals, stock fitting
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use lacteos_core::money::{Money, Percentage};
//! use lacteos_core::pricing::LineAmounts;
//!
//! # fn main() -> Result<(), lacteos_core::CoreError> {
//! let line = LineAmounts::compute(3, Money::from_cents(250), Money::from_cents(150))?;
//! assert_eq!(line.subtotal.cents(), 750);
//! assert_eq!(line.profit.cents(), 300);
//!
//! // Profit over cost: 300 / 450 = 66.67%
//! let roi = Percentage::ratio(line.profit, line.cost_subtotal);
//! assert_eq!(roi.bps(), 6667);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::{Money, Percentage};
pub use types::*;

/// Share of the selling price used as unit cost when a product has no cost
/// recorded (percent).
pub const DEFAULT_COST_RATIO_PERCENT: i64 = 60;

/// Products below this stock level show up in the low-stock report.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Number of in-stock products shown on the home page.
pub const FEATURED_PRODUCTS: i64 = 4;

/// Message returned when a purchase request carries no positive quantity.
pub const EMPTY_PURCHASE_MESSAGE: &str = "Please select at least one item to purchase.";

/// Message returned when every requested line was skipped.
pub const NO_VALID_ITEMS_MESSAGE: &str = "No valid items were added to the sale.";
