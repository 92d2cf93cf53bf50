//! # Pricing
//!
//! Line item math, sale totals, and stock fitting for the purchase flow.
//!
//! ```text
//! PurchaseLine { product, qty: 12 }        Product { stock: 8, price: 2.50, cost: 0 }
//!        │                                          │
//!        ▼                                          ▼
//!  fit_to_stock(12, 8) ──► qty 8 + warning   effective_unit_cost ──► 1.50 (60%)
//!        │                                          │
//!        └──────────────► LineAmounts::compute(8, 2.50, 1.50)
//!                              subtotal 20.00 / cost 12.00 / profit 8.00
//!                                          │
//!                                          ▼
//!                            SaleTotals::from_lines(...)  roi = profit / cost
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::{Money, Percentage};
use crate::types::SaleItem;
use crate::DEFAULT_COST_RATIO_PERCENT;

// =============================================================================
// Line Amounts
// =============================================================================

/// Derived amounts of one sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub cost_subtotal: Money,
    pub profit: Money,
}

impl LineAmounts {
    /// subtotal = qty × unit price, cost_subtotal = qty × cost price,
    /// profit = subtotal − cost_subtotal.
    ///
    /// Fails with [`CoreError::AmountOverflow`] when an amount leaves `i64`.
    pub fn compute(quantity: i64, unit_price: Money, cost_price: Money) -> Result<Self, CoreError> {
        let subtotal = unit_price
            .multiply_quantity(quantity)
            .ok_or(CoreError::AmountOverflow)?;
        let cost_subtotal = cost_price
            .multiply_quantity(quantity)
            .ok_or(CoreError::AmountOverflow)?;
        let profit = subtotal
            .checked_sub(cost_subtotal)
            .ok_or(CoreError::AmountOverflow)?;

        Ok(LineAmounts {
            subtotal,
            cost_subtotal,
            profit,
        })
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Aggregate amounts stored on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaleTotals {
    pub total_amount: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub roi: Percentage,
}

impl SaleTotals {
    /// Sums the lines. ROI is zero when the total cost is zero.
    pub fn from_lines<I>(lines: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = LineAmounts>,
    {
        let mut total_amount = Money::zero();
        let mut total_cost = Money::zero();
        for line in lines {
            total_amount = total_amount
                .checked_add(line.subtotal)
                .ok_or(CoreError::AmountOverflow)?;
            total_cost = total_cost
                .checked_add(line.cost_subtotal)
                .ok_or(CoreError::AmountOverflow)?;
        }
        let total_profit = total_amount
            .checked_sub(total_cost)
            .ok_or(CoreError::AmountOverflow)?;

        Ok(SaleTotals {
            total_amount,
            total_cost,
            total_profit,
            roi: Percentage::ratio(total_profit, total_cost),
        })
    }

    pub fn from_items(items: &[SaleItem]) -> Result<Self, CoreError> {
        Self::from_lines(items.iter().map(SaleItem::amounts))
    }
}

// =============================================================================
// Cost Fallback
// =============================================================================

/// Unit cost recorded on a sale line.
///
/// Products without a cost are booked at 60% of their price so that profit
/// and ROI stay meaningful.
///
/// ```rust
/// use lacteos_core::money::Money;
/// use lacteos_core::pricing::effective_unit_cost;
///
/// assert_eq!(effective_unit_cost(Money::from_cents(250), Money::zero()).cents(), 150);
/// assert_eq!(effective_unit_cost(Money::from_cents(250), Money::from_cents(90)).cents(), 90);
/// ```
pub fn effective_unit_cost(price: Money, cost: Money) -> Money {
    if cost.is_positive() {
        cost
    } else {
        price.percent_of(DEFAULT_COST_RATIO_PERCENT)
    }
}

// =============================================================================
// Stock Fitting
// =============================================================================

/// Quantity that can actually be sold for a requested line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockFit {
    pub quantity: i64,
    /// True when the request was cut down to the available stock.
    pub adjusted: bool,
}

/// Clamps a requested quantity to what is on hand.
///
/// Non-positive requests fit to zero without counting as an adjustment.
pub fn fit_to_stock(requested: i64, stock: i64) -> StockFit {
    if requested <= 0 {
        return StockFit {
            quantity: 0,
            adjusted: false,
        };
    }
    let available = stock.max(0);
    if requested > available {
        StockFit {
            quantity: available,
            adjusted: true,
        }
    } else {
        StockFit {
            quantity: requested,
            adjusted: false,
        }
    }
}

/// Warning shown when a line was clamped to the available stock.
pub fn stock_warning(available: i64, product_name: &str) -> String {
    format!(
        "Only {} units available for {}. Adjusted quantity.",
        available, product_name
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
