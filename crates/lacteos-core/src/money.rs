//! Integer money and basis-point percentages.
//!
//! Prices, costs, subtotals and totals are `i64` cents. Margins and ROI are
//! `i64` basis points (1 bp = 0.01 %). No floating point anywhere, so a
//! sale total always equals the sum of its line subtotals exactly.
//!
//! ```rust
//! use lacteos_core::money::{Money, Percentage};
//!
//! let price = Money::from_cents(1099);
//! assert_eq!(price.to_string(), "$10.99");
//!
//! let margin = Percentage::ratio(Money::from_cents(50), Money::from_cents(200));
//! assert_eq!(margin.to_string(), "25.00%");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// An amount in cents.
///
/// ```text
/// Product.price_cents ──► SaleItem.unit_price ──► SaleItem.subtotal
///                                                      │
///                                Sale.total_amount ◄───┘ (Σ subtotals)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Line amount for `qty` units, `None` on overflow.
    ///
    /// ```rust
    /// use lacteos_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).multiply_quantity(3).map(|m| m.cents()), Some(897));
    /// assert!(Money::from_cents(i64::MAX).multiply_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `percent`% of this amount, rounded half away from zero to the cent.
    ///
    /// ```rust
    /// use lacteos_core::money::Money;
    ///
    /// // 60% of $2.49 = $1.494 → $1.49
    /// assert_eq!(Money::from_cents(249).percent_of(60).cents(), 149);
    /// ```
    pub fn percent_of(&self, percent: i64) -> Money {
        let scaled = self.0 as i128 * percent as i128;
        Money::from_cents(round_div(scaled, 100) as i64)
    }
}

/// Integer division rounding half away from zero. `den` must be positive.
fn round_div(num: i128, den: i128) -> i128 {
    if num >= 0 {
        (2 * num + den) / (2 * den)
    } else {
        -((-2 * num + den) / (2 * den))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

/// A ratio in basis points: 2550 bps = 25.50 %.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        Percentage(bps)
    }

    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// `part / whole × 100`, rounded to the basis point.
    ///
    /// Zero when `whole` is zero or negative: ROI and margin are both 0 when
    /// there is no cost to compare against.
    ///
    /// ```rust
    /// use lacteos_core::money::{Money, Percentage};
    ///
    /// let roi = Percentage::ratio(Money::from_cents(300), Money::from_cents(450));
    /// assert_eq!(roi.bps(), 6667);
    ///
    /// let none = Percentage::ratio(Money::from_cents(300), Money::zero());
    /// assert_eq!(none.bps(), 0);
    /// ```
    pub fn ratio(part: Money, whole: Money) -> Self {
        if whole.cents() <= 0 {
            return Percentage(0);
        }
        let bps = round_div(part.cents() as i128 * 10_000, whole.cents() as i128);
        Percentage(bps as i64)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}%", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply_quantity(3), Some(Money::from_cents(3000)));

        let mut total = a;
        total += b;
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let huge = Money::from_cents(i64::MAX - 1);

        assert!(huge.multiply_quantity(2).is_none());
        assert!(huge.checked_add(Money::from_cents(2)).is_none());
        assert_eq!(huge.checked_add(Money::from_cents(1)), Some(Money::from_cents(i64::MAX)));
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_none());
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);

        let empty: Money = std::iter::empty::<Money>().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // 60% of 1.25 = 0.75
        assert_eq!(Money::from_cents(125).percent_of(60).cents(), 75);
        // 60% of 0.01 = 0.006 → 0.01
        assert_eq!(Money::from_cents(1).percent_of(60).cents(), 1);
        // 60% of 0.03 = 0.018 → 0.02
        assert_eq!(Money::from_cents(3).percent_of(60).cents(), 2);
        // 50% of 0.05 = 0.025 → 0.03
        assert_eq!(Money::from_cents(5).percent_of(50).cents(), 3);
        assert_eq!(Money::zero().percent_of(60).cents(), 0);
    }

    #[test]
    fn test_ratio() {
        let pct = Percentage::ratio(Money::from_cents(50), Money::from_cents(200));
        assert_eq!(pct.bps(), 2500);
        assert_eq!(pct.to_string(), "25.00%");

        // 1/3 and 2/3
        assert_eq!(Percentage::ratio(Money::from_cents(1), Money::from_cents(3)).bps(), 3333);
        assert_eq!(Percentage::ratio(Money::from_cents(2), Money::from_cents(3)).bps(), 6667);
    }

    #[test]
    fn test_ratio_without_cost_is_zero() {
        assert_eq!(Percentage::ratio(Money::from_cents(999), Money::zero()).bps(), 0);
        assert_eq!(Percentage::ratio(Money::from_cents(999), Money::from_cents(-1)).bps(), 0);
    }

    #[test]
    fn test_selling_below_cost() {
        // -100 / 400 = -25%
        let pct = Percentage::ratio(Money::from_cents(-100), Money::from_cents(400));
        assert_eq!(pct.bps(), -2500);
        assert_eq!(pct.to_string(), "-25.00%");
    }
}
