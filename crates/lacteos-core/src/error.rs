//! Business-rule and input errors.
//!
//! ```text
//! ValidationError ──► CoreError ──► DbError (lacteos-db) ──► AppError (apps/web)
//! ```
//!
//! Missing rows are reported by the storage layer, not here.

use thiserror::Error;

use crate::{EMPTY_PURCHASE_MESSAGE, NO_VALID_ITEMS_MESSAGE};

#[derive(Debug, Error)]
pub enum CoreError {
    /// A stock adjustment would leave the product below zero units.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// No purchase line asked for a positive quantity.
    #[error("{}", EMPTY_PURCHASE_MESSAGE)]
    EmptyPurchase,

    /// Every line of a purchase was skipped (unknown product or no stock).
    #[error("{}", NO_VALID_ITEMS_MESSAGE)]
    NoValidItems,

    /// A line or sale amount does not fit in 64-bit cents.
    #[error("Sale amount is too large.")]
    AmountOverflow,

    #[error("Product {0} has recorded sales and cannot be deleted")]
    ProductInUse(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Rejected input. Raised before anything touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: i64 },

    #[error("{field} cannot be negative")]
    Negative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}
