//! Order totals using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g. rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a price from minor units (paise).
    #[must_use]
    pub fn from_minor_units(minor: u64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::from(minor) / Decimal::ONE_HUNDRED,
            currency_code,
        }
    }
}

/// ISO 4217 currency codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        let price = Price::from_minor_units(19_950, CurrencyCode::INR);
        assert_eq!(price.amount, Decimal::new(19_950, 2));
    }
}
