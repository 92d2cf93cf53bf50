//! # Validation Module
//!
//! Input validation for Lacteos.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (apps/web)                                      │
//! │  └── JSON deserialization (types, required keys)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Lengths, ranges, formats                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── UNIQUE (username)                                                 │
//! │  └── Foreign keys (protected products, cascading items)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::ProductInput;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_PRODUCT_NAME: usize = 100;
pub const MAX_CATEGORY: usize = 50;
pub const MAX_UNIT: usize = 20;
pub const MAX_CUSTOMER_NAME: usize = 100;
pub const MAX_REASON: usize = 200;
pub const MAX_USERNAME: usize = 150;
pub const MAX_PERSON_NAME: usize = 150;
pub const MAX_PHONE: usize = 20;
pub const MIN_PASSWORD: usize = 8;
/// 99,999,999.99: ten digits, two of them decimals.
pub const MAX_AMOUNT_CENTS: i64 = 9_999_999_999;
pub const MAX_STOCK: i64 = i32::MAX as i64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field: trimmed, non-empty, at most `max` chars.
///
/// ```rust
/// use lacteos_core::validation::validate_required_text;
///
/// assert!(validate_required_text("unit", "litro", 20).is_ok());
/// assert!(validate_required_text("unit", "   ", 20).is_err());
/// ```
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_optional_text(field, value, max)
}

/// Validates an optional text field: at most `max` chars, may be empty.
pub fn validate_optional_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that an amount or count is zero or more.
///
/// ```rust
/// use lacteos_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", 0).is_ok());
/// assert!(validate_non_negative("price", -1).is_err());
/// ```
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates that a value lies in `0..=max`.
///
/// ```rust
/// use lacteos_core::validation::validate_in_range;
///
/// assert!(validate_in_range("stock", 10, 100).is_ok());
/// assert!(validate_in_range("stock", 101, 100).is_err());
/// ```
pub fn validate_in_range(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    validate_non_negative(field, value)?;
    if value > max {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a quantity on a sale line.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates product fields for create and update.
///
/// ## Rules
/// - name (≤ 100), category (≤ 50), unit (≤ 20) required
/// - price and cost in `0..=MAX_AMOUNT_CENTS`, stock in `0..=MAX_STOCK`
pub fn validate_product(input: &ProductInput) -> ValidationResult<()> {
    validate_required_text("name", &input.name, MAX_PRODUCT_NAME)?;
    validate_required_text("category", &input.category, MAX_CATEGORY)?;
    validate_required_text("unit", &input.unit, MAX_UNIT)?;
    validate_in_range("price", input.price_cents, MAX_AMOUNT_CENTS)?;
    validate_in_range("cost", input.cost_cents, MAX_AMOUNT_CENTS)?;
    validate_in_range("stock", input.stock, MAX_STOCK)?;
    Ok(())
}

/// Validates a username: ≤ 150 chars of letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_required_text("username", username, MAX_USERNAME)?;

    if !username
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "may contain only letters, numbers, and @/./+/-/_ characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a new password: at least 8 characters, not entirely numeric.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD,
        });
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "cannot be entirely numeric".to_string(),
        });
    }

    Ok(())
}

/// Validates an e-mail address. Empty is accepted (e-mail is optional).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid e-mail address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
