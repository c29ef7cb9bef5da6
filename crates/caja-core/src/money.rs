//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats a mixed payment of 0.10 + 0.20 against a 0.30 order        │
//! │  compares as 0.30000000000000004 != 0.3, so every check needs a fuzzy   │
//! │  "within 0.01" tolerance.                                               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10 + 20 == 30 exactly. The 0.01 tolerance becomes one cent.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_cents(6500); // $65.00
//! let parsed: Money = "65.00".parse().unwrap();
//! assert_eq!(price, parsed);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::{Quantity, MILLIS_PER_UNIT};

/// Largest difference treated as "equal" when reconciling payments (0.01).
pub const MONEY_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for balance deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// Product.prices[level] ──► OrderLine.unit_price ──► OrderLine.total()
///                                                         │
///                         Order.discount_total ──► Order.total()
///                                                         │
///         PaymentBreakdown / Cash received ──► SettlementPlan ──► Client.balance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `self - other`, never below zero.
    #[inline]
    pub fn saturating_sub_floor(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Rounds half away from zero to the cent, the same way the receipt
    /// shows it. Saturates at the `i64` bounds; order edits go through
    /// [`Money::checked_times`] so a stored line never gets there.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::quantity::Quantity;
    ///
    /// let per_kg = Money::from_cents(3999); // $39.99 / kg
    /// let net = Quantity::from_millis(1_250); // 1.250 kg
    /// // 39.99 × 1.25 = 49.9875 → $49.99
    /// assert_eq!(per_kg.times(net).cents(), 4999);
    /// ```
    pub fn times(&self, qty: Quantity) -> Money {
        self.checked_times(qty).unwrap_or_else(|| {
            if self.is_negative() == (qty.millis() < 0) {
                Money(i64::MAX)
            } else {
                Money(i64::MIN)
            }
        })
    }

    /// [`Money::times`], or `None` when the result does not fit in cents.
    pub fn checked_times(&self, qty: Quantity) -> Option<Money> {
        let raw = self.0 as i128 * qty.millis() as i128;
        let half = MILLIS_PER_UNIT as i128 / 2;
        let rounded = if raw >= 0 {
            (raw + half) / MILLIS_PER_UNIT as i128
        } else {
            (raw - half) / MILLIS_PER_UNIT as i128
        };
        i64::try_from(rounded).ok().map(Money)
    }

    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Checks whether two amounts reconcile within [`MONEY_TOLERANCE`].
    ///
    /// With integer cents the tolerance is strict: amounts must match to
    /// the cent.
    #[inline]
    pub fn reconciles_with(&self, other: Money) -> bool {
        self.0.abs_diff(other.0) < MONEY_TOLERANCE.0 as u64
    }

    /// Checks whether an outstanding balance counts as settled.
    #[inline]
    pub fn is_settled_balance(&self) -> bool {
        self.0 <= MONEY_TOLERANCE.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. The terminal formats with the configured
/// currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Parses a decimal amount such as `150`, `150.5` or `150.05`.
///
/// No floating point is involved; more than two decimals is rejected.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim().trim_start_matches('$');
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("not a number"));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("not a number"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("not a number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("not a number"))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// Arithmetic saturates instead of wrapping.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!("150".parse::<Money>().unwrap().cents(), 15000);
        assert_eq!("150.5".parse::<Money>().unwrap().cents(), 15050);
        assert_eq!("150.05".parse::<Money>().unwrap().cents(), 15005);
        assert_eq!("$0.99".parse::<Money>().unwrap().cents(), 99);
        assert_eq!(".5".parse::<Money>().unwrap().cents(), 50);
        assert_eq!("-3.20".parse::<Money>().unwrap().cents(), -320);

        assert!("".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1,50".parse::<Money>().is_err());
    }

    #[test]
    fn test_times_whole_units() {
        let price = Money::from_cents(6500);
        assert_eq!(price.times(Quantity::from_units(2)).cents(), 13000);
    }

    #[test]
    fn test_times_rounds_half_up() {
        // 0.05 × 0.5 = 0.025 → 0.03
        let price = Money::from_cents(5);
        assert_eq!(price.times(Quantity::from_millis(500)).cents(), 3);

        // 10.00 × 0.333 = 3.33
        let price = Money::from_cents(1000);
        assert_eq!(price.times(Quantity::from_millis(333)).cents(), 333);
    }

    #[test]
    fn test_reconciliation() {
        let total = Money::from_cents(15000);
        assert!(total.reconciles_with(Money::from_cents(15000)));
        assert!(!total.reconciles_with(Money::from_cents(15001)));

        assert!(Money::from_cents(1).is_settled_balance());
        assert!(Money::zero().is_settled_balance());
        assert!(!Money::from_cents(2).is_settled_balance());
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!(b.saturating_sub_floor(a), Money::zero());

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_overflow_never_wraps() {
        let price = Money::from_cents(4_999);
        let huge = Quantity::from_millis(i64::MAX / 2);

        assert_eq!(price.checked_times(huge), None);
        assert_eq!(price.times(huge), Money::from_cents(i64::MAX));
        assert_eq!((-price).times(huge), Money::from_cents(i64::MIN));

        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(max + Money::from_cents(1), max);
        assert!(!(max + max).is_negative());
    }
}
