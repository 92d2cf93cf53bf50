//! # Domain Types
//!
//! Core domain types used throughout Lacteos.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┼─ (via items) ───┼───│  product_id     │       │
//! │  │  price_cents    │   │  total_amount   │◄──│  sale_id        │       │
//! │  │  cost_cents     │   │  total_cost     │   │  subtotal       │       │
//! │  │  stock          │   │  roi_bps        │   │  profit         │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PriceHistory   │   │      User       │◄──│  UserProfile    │       │
//! │  │  price / cost   │   │  username       │   │  role           │       │
//! │  │  changed_by     │   │  is_superuser   │   │  phone/address  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ids are UUID v4 strings; all money is integer cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::{Money, Percentage};
use crate::pricing::LineAmounts;

// =============================================================================
// Product
// =============================================================================

/// A dairy product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Selling price in cents.
    pub price_cents: i64,
    /// Purchase cost per unit in cents. Zero when unknown.
    pub cost_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Unit of sale ("litro", "kg", "pieza", ...).
    pub unit: String,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Price minus cost.
    pub fn profit_per_unit(&self) -> Money {
        self.price() - self.cost()
    }

    /// (price − cost) / cost, or zero when no cost is recorded.
    pub fn profit_margin(&self) -> Percentage {
        Percentage::ratio(self.profit_per_unit(), self.cost())
    }

    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Fields accepted when creating or editing a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    pub stock: i64,
    pub unit: String,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

impl ProductInput {
    /// Returns a copy with surrounding whitespace removed from text fields.
    pub fn trimmed(&self) -> Self {
        ProductInput {
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            description: self.description.trim().to_string(),
            unit: self.unit.trim().to_string(),
            ..self.clone()
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale. Totals are always derived from its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub sale_date: DateTime<Utc>,
    /// Empty for walk-in customers.
    pub customer_name: String,
    pub notes: String,
    pub total_amount_cents: i64,
    pub total_cost_cents: i64,
    pub total_profit_cents: i64,
    pub roi_bps: i64,
    /// User that recorded the sale. `None` once that user is deleted.
    pub created_by: Option<String>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    #[inline]
    pub fn total_profit(&self) -> Money {
        Money::from_cents(self.total_profit_cents)
    }

    #[inline]
    pub fn roi(&self) -> Percentage {
        Percentage::from_bps(self.roi_bps)
    }
}

impl fmt::Display for Sale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sale #{} - {}",
            self.id,
            self.sale_date.format("%Y-%m-%d %H:%M")
        )
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale. Unit price and cost are frozen at the time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Cost per unit at time of sale.
    pub cost_price_cents: i64,
    pub subtotal_cents: i64,
    pub cost_subtotal_cents: i64,
    pub profit_cents: i64,
}

impl SaleItem {
    /// Stored derived amounts of this line.
    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            subtotal: Money::from_cents(self.subtotal_cents),
            cost_subtotal: Money::from_cents(self.cost_subtotal_cents),
            profit: Money::from_cents(self.profit_cents),
        }
    }
}

/// A sale item joined with its product's current name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItemDetail {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: SaleItem,
    pub product_name: String,
}

/// One requested line of a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything the purchase flow needs to record a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleDraft {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<PurchaseLine>,
}

impl SaleDraft {
    /// True when at least one line asks for a positive quantity.
    pub fn has_positive_line(&self) -> bool {
        self.items.iter().any(|line| line.quantity > 0)
    }
}

/// Result of a committed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
    /// One entry per line that was cut down to the available stock.
    pub warnings: Vec<String>,
}

impl SaleReceipt {
    /// Confirmation shown to the buyer.
    pub fn message(&self) -> String {
        format!(
            "Sale #{} created successfully! Total: {}",
            self.sale.id,
            self.sale.total_amount()
        )
    }
}

// =============================================================================
// Price History
// =============================================================================

/// Append-only log of price and cost changes for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriceHistory {
    pub id: String,
    pub product_id: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<String>,
    pub reason: String,
}

// =============================================================================
// Role
// =============================================================================

/// Access role stored on a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Employee,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Employee, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }

    /// Human-readable label shown in listings.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Customer => "Cliente",
            Role::Employee => "Empleado",
            Role::Admin => "Administrador",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// User & Profile
// =============================================================================

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last", falling back to the username.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Per-user profile carrying the access role. Exactly one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with its profile. Role checks live here because the
/// admin check also looks at the account's superuser flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    pub profile: UserProfile,
}

impl Account {
    /// Admin role, or a superuser account.
    pub fn is_admin(&self) -> bool {
        self.profile.role == Role::Admin || self.user.is_superuser
    }

    /// Employee role, or anyone passing [`Account::is_admin`].
    pub fn is_employee(&self) -> bool {
        self.profile.role == Role::Employee || self.is_admin()
    }

    pub fn is_customer(&self) -> bool {
        self.profile.role == Role::Customer
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
