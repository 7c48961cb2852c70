//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12, 2)` in rubles. All arithmetic goes
//! through [`rust_decimal::Decimal`] so totals never pick up float noise.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative amount of money in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

/// Error returned when constructing a negative [`Price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("price cannot be negative")]
pub struct NegativePrice;

impl Price {
    /// Zero rubles.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`NegativePrice`] if `amount < 0`.
    pub fn new(amount: Decimal) -> Result<Self, NegativePrice> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(NegativePrice);
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format with exactly two decimal places, e.g. `"1499.00"`.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rounded = self.0.round_dp(2);
        rounded.rescale(2);
        rounded.to_string()
    }
}

impl std::ops::Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, p| acc + p)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::new(Decimal::from(-1)), Err(NegativePrice));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_display_pads_to_two_places() {
        assert_eq!(price("100").display(), "100.00");
        assert_eq!(price("99.5").display(), "99.50");
        assert_eq!(price("0.125").display(), "0.12");
    }

    #[test]
    fn test_line_total_and_sum() {
        let total: Price = [price("100").line_total(2), price("150").line_total(1)]
            .into_iter()
            .sum();
        assert_eq!(total.display(), "350.00");
    }
}
