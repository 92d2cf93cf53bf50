//! # Repository Module
//!
//! Database repository implementations for Lacteos.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().list_available(&filter)                         │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list_available(&self, filter)                                     │
//! │  ├── get(&self, id)                                                    │
//! │  ├── create(&self, input)                                              │
//! │  └── update(&self, id, input, changed_by, reason)                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Statements that must share a transaction live in free functions taking
//! `&mut SqliteConnection`; repository methods open the transaction and pass
//! `&mut *tx` down.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD, filters, stock
//! - [`sale::SaleRepository`] - Purchase flow, items, totals
//! - [`price_history::PriceHistoryRepository`] - Price change log
//! - [`user::UserRepository`] - Accounts and profiles
//! - [`token::TokenRepository`] - Revoked session tokens
//! - [`report::ReportRepository`] - Dashboard aggregates

pub mod price_history;
pub mod product;
pub mod report;
pub mod sale;
pub mod token;
pub mod user;

/// Builds a `LIKE` pattern matching `term` anywhere, with `%`, `_` and `\`
/// escaped. Use together with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Generates a new entity ID.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
