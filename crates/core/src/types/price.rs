//! Type-safe price representation using decimal arithmetic.
//!
//! Listing prices are currency-agnostic decimal amounts; the storefront
//! currently displays everything in Danish kroner. The display format matches
//! the web client's historical rendering: thousands-separated amount followed
//! by the currency suffix, e.g. `1,234.5 kr DKK`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// ISO 4217 currency codes accepted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    /// Danish krone (the only currency the marketplace trades in today).
    #[default]
    Dkk,
}

impl CurrencyCode {
    /// Display suffix appended after the amount.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Dkk => "kr DKK",
        }
    }
}

/// A non-negative listing price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g. kroner, not øre).
    amount: Decimal,
    /// ISO 4217 currency code.
    currency: CurrencyCode,
}

impl Price {
    /// Create a new price in the default currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        Self::with_currency(amount, CurrencyCode::default())
    }

    /// Create a new price in an explicit currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn with_currency(amount: Decimal, currency: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self { amount, currency })
    }

    /// The raw decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The price's currency.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Format for display: grouped thousands plus the currency suffix.
    ///
    /// `1234.5` renders as `1,234.5 kr DKK`. Trailing zeros are preserved as
    /// stored, so `100.00` renders as `100.00 kr DKK`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {}", group_thousands(&self.amount), self.currency.suffix())
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Insert comma separators into the integer part of a decimal's string form.
fn group_thousands(amount: &Decimal) -> String {
    let raw = amount.to_string();
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    let len = digits.len();
    for (i, c) in digits.iter().enumerate() {
        grouped.push(*c);
        let remaining = len - i - 1;
        if remaining > 0 && remaining % 3 == 0 && c.is_ascii_digit() {
            grouped.push(',');
        }
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let minus_one = Decimal::new(-1, 0);
        let err = Price::new(minus_one).unwrap_err();
        assert_eq!(err, PriceError::Negative(minus_one));
    }

    #[test]
    fn test_zero_price_allowed() {
        let price = Price::new(Decimal::ZERO).expect("zero is a valid price");
        assert_eq!(price.display(), "0 kr DKK");
    }

    #[test]
    fn test_display_groups_thousands_with_fraction() {
        let price = Price::new(Decimal::new(12345, 1)).expect("valid");
        assert_eq!(price.display(), "1,234.5 kr DKK");
    }

    #[test]
    fn test_display_groups_large_integer() {
        let price = Price::new(Decimal::new(12_500_000, 0)).expect("valid");
        assert_eq!(price.display(), "12,500,000 kr DKK");
    }

    #[test]
    fn test_display_small_amount_ungrouped() {
        let price = Price::new(Decimal::new(99999, 2)).expect("valid");
        assert_eq!(price.display(), "999.99 kr DKK");
    }

    #[test]
    fn test_display_preserves_stored_scale() {
        let price = Price::new(Decimal::new(10000, 2)).expect("valid");
        assert_eq!(price.display(), "100.00 kr DKK");
    }
}
