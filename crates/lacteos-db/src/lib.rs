//! # lacteos-db: Database Layer for Lacteos
//!
//! SQLite storage for the dairy shop: products, sales, price history,
//! accounts, revoked tokens, and the dashboard aggregates.
//!
//! ## Layout
//! ```text
//!   POST /purchase ──► db.sales().record_sale(draft, user)
//!                              │
//!            ┌─────────────────┼──────────────────────┐
//!            │   one transaction on one connection    │
//!            │   insert sale ─► per line: clamp,      │
//!            │   insert item, decrement stock ─►      │
//!            │   recompute totals                     │
//!            └─────────────────┼──────────────────────┘
//!                              ▼
//!                    SQLite (WAL), migrations/sqlite/*.sql
//! ```
//!
//! - [`pool`]: `Database` handle and `DbConfig`
//! - [`repository`]: one repository per table group
//! - [`migrations`]: schema embedded at compile time
//! - [`password`]: argon2 hashing for account passwords
//! - [`error`]: `DbError`
//!
//! ```rust,ignore
//! use lacteos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("lacteos.db")).await?;
//! let receipt = db.sales().record_sale(&draft, Some(&user_id)).await?;
//! println!("{}", receipt.message());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::price_history::PriceHistoryRepository;
pub use repository::product::{ProductFilter, ProductRepository};
pub use repository::report::{DashboardReport, ReportRepository};
pub use repository::sale::{NewSale, SaleRepository};
pub use repository::token::TokenRepository;
pub use repository::user::{NewUser, UserFilter, UserRepository, UserUpdate};
