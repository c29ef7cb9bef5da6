//! # Quantity Module
//!
//! Fractional quantities for weighed goods.
//!
//! Bulk products are sold by weight (42.5 kg), so line quantities and stock
//! cannot be plain integers. Like [`Money`](crate::money::Money), a
//! `Quantity` is an integer in the smallest unit the scale reports:
//! thousandths of a unit (grams for kilogram products).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Thousandths per whole unit.
pub const MILLIS_PER_UNIT: i64 = 1000;

/// Largest quantity a line, a weighing or a stock receipt may carry.
pub const MAX_QUANTITY: Quantity = Quantity::from_units(1_000_000);

/// A quantity, weight or stock level in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths (grams for kg goods).
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Quantity(millis)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLIS_PER_UNIT)
    }

    /// Returns the value in thousandths.
    #[inline]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Within `0 < q <= MAX_QUANTITY`.
    #[inline]
    pub const fn is_valid_amount(&self) -> bool {
        self.0 > 0 && self.0 <= MAX_QUANTITY.0
    }

    /// Multiplies by a whole count (e.g. tare weight × number of boxes),
    /// saturating at the `i64` bounds.
    #[inline]
    pub const fn times_count(&self, count: u32) -> Quantity {
        Quantity(self.0.saturating_mul(count as i64))
    }

    #[inline]
    pub const fn checked_times_count(&self, count: u32) -> Option<Quantity> {
        match self.0.checked_mul(count as i64) {
            Some(millis) => Some(Quantity(millis)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, other: Quantity) -> Option<Quantity> {
        match self.0.checked_add(other.0) {
            Some(millis) => Some(Quantity(millis)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        match self.0.checked_sub(other.0) {
            Some(millis) => Some(Quantity(millis)),
            None => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / MILLIS_PER_UNIT).abs();
        let frac = (self.0 % MILLIS_PER_UNIT).abs();
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let frac = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, frac.trim_end_matches('0'))
        }
    }
}

/// Parses `2`, `42.5` or `0.125` (up to three decimals), at most
/// [`MAX_QUANTITY`] in magnitude.
impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "quantity".to_string(),
            });
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if frac.len() > 3 {
            return Err(invalid("at most three decimal places"));
        }
        if (whole.is_empty() && frac.is_empty())
            || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid("not a number"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("quantity too large"))?
        };
        let frac_millis: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<3}", frac);
            padded.parse().map_err(|_| invalid("not a number"))?
        };

        let millis = whole
            .checked_mul(MILLIS_PER_UNIT)
            .and_then(|m| m.checked_add(frac_millis))
            .filter(|m| *m <= MAX_QUANTITY.0)
            .ok_or_else(|| invalid("quantity too large"))?;

        Ok(Quantity(if negative { -millis } else { millis }))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("2".parse::<Quantity>().unwrap().millis(), 2000);
        assert_eq!("42.5".parse::<Quantity>().unwrap().millis(), 42_500);
        assert_eq!("0.125".parse::<Quantity>().unwrap().millis(), 125);
        assert_eq!("-1.5".parse::<Quantity>().unwrap().millis(), -1500);

        assert!("1.2345".parse::<Quantity>().is_err());
        assert!("kg".parse::<Quantity>().is_err());
        assert!("".parse::<Quantity>().is_err());

        assert_eq!("1000000".parse::<Quantity>().unwrap(), MAX_QUANTITY);
        assert!("1000000.001".parse::<Quantity>().is_err());
        assert!("9000000000000000".parse::<Quantity>().is_err());
        assert!("-9000000000000000".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_units(3).to_string(), "3");
        assert_eq!(Quantity::from_millis(42_500).to_string(), "42.5");
        assert_eq!(Quantity::from_millis(125).to_string(), "0.125");
        assert_eq!(Quantity::from_millis(-7_500).to_string(), "-7.5");
    }

    #[test]
    fn test_times_count() {
        let tare = Quantity::from_millis(2_500);
        assert_eq!(tare.times_count(3), Quantity::from_millis(7_500));
        assert_eq!(tare.times_count(0), Quantity::zero());

        let heavy = Quantity::from_millis(i64::MAX / 2);
        assert_eq!(heavy.checked_times_count(3), None);
        assert_eq!(heavy.times_count(3), Quantity::from_millis(i64::MAX));
        assert_eq!(heavy.checked_add(heavy).map(|q| q.millis()), Some(i64::MAX - 1));
    }
}
