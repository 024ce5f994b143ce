//! Money amounts using decimal arithmetic.
//!
//! Prices and order totals are stored as `NUMERIC(10, 2)`, so a [`Money`]
//! value always carries exactly two decimal places and at most eight digits
//! before the decimal point.

use core::fmt;
use core::iter::Sum;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Money`] amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("enter a number")]
    NotANumber,
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// More than two digits after the decimal point.
    #[error("ensure that there are no more than {max} decimal places")]
    TooManyDecimalPlaces {
        /// Maximum allowed decimal places.
        max: u32,
    },
    /// The amount does not fit in the column.
    #[error("ensure that there are no more than {max} digits in total")]
    TooManyDigits {
        /// Maximum allowed digits.
        max: u32,
    },
}

/// A non-negative amount of money in the store currency.
///
/// ```
/// use bazaar_core::Money;
///
/// let price = Money::parse("19.99").unwrap();
/// assert_eq!(price.times(3).to_string(), "$59.97");
/// assert!(Money::parse("-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Maximum number of digits (integer and fractional together).
    pub const MAX_DIGITS: u32 = 10;
    /// Number of decimal places every amount is kept at.
    pub const DECIMAL_PLACES: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal, normalizing it to two decimal places.
    ///
    /// Used for values read back from the database, which already satisfy
    /// the column constraints.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp(Self::DECIMAL_PLACES);
        amount.rescale(Self::DECIMAL_PLACES);
        Self(amount)
    }

    /// Parse a user-entered amount such as `"12"`, `"12.5"` or `"12.50"`.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] when the input is not a number, is negative,
    /// has more than two decimal places, or exceeds ten digits in total.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| MoneyError::NotANumber)?;

        if amount < Decimal::ZERO {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > Self::DECIMAL_PLACES {
            return Err(MoneyError::TooManyDecimalPlaces {
                max: Self::DECIMAL_PLACES,
            });
        }
        let integer_digit_limit = Decimal::from(10_i64.pow(Self::MAX_DIGITS - Self::DECIMAL_PLACES));
        if amount.trunc() >= integer_digit_limit {
            return Err(MoneyError::TooManyDigits {
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self::new(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.0 * Decimal::from(quantity))
    }

    /// The amount without the currency symbol, e.g. `12.50`.
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self::new(iter.map(|m| m.0).sum())
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::parse(s).expect("valid amount")
    }

    #[test]
    fn test_parse_pads_to_two_places() {
        assert_eq!(money("12").to_string(), "$12.00");
        assert_eq!(money("12.5").to_string(), "$12.50");
        assert_eq!(money("0").plain(), "0.00");
    }

    #[test]
    fn test_parse_accepts_trailing_zeros_beyond_two_places() {
        assert_eq!(money("3.1000"), money("3.10"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Money::parse("abc"), Err(MoneyError::NotANumber));
        assert_eq!(Money::parse("-0.01"), Err(MoneyError::Negative));
        assert_eq!(
            Money::parse("1.005"),
            Err(MoneyError::TooManyDecimalPlaces { max: 2 })
        );
        assert_eq!(
            Money::parse("100000000"),
            Err(MoneyError::TooManyDigits { max: 10 })
        );
        assert!(Money::parse("99999999.99").is_ok());
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [money("19.99").times(3), money("0.50").times(2)];
        let total: Money = lines.iter().sum();
        assert_eq!(total, money("60.97"));
        assert_eq!(Money::ZERO.times(5), Money::ZERO);
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let total: Money = Vec::<Money>::new().into_iter().sum();
        assert_eq!(total.to_string(), "$0.00");
    }
}
