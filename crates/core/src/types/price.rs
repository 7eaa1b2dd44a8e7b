//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are kept in the currency's standard unit (reais, not centavos)
/// using decimal arithmetic so marketplace prices never accumulate float
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in BRL, the currency Bling and the Brazilian
    /// marketplaces settle in.
    #[must_use]
    pub const fn brl(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::BRL)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.2}", self.currency_code.code(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BRL,
    USD,
    EUR,
}

impl CurrencyCode {
    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BRL => "BRL",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_brl_default() {
        let price = Price::brl(Decimal::new(9990, 2));
        assert_eq!(price.currency_code, CurrencyCode::BRL);
        assert_eq!(price.amount, Decimal::new(9990, 2));
    }

    #[test]
    fn test_display() {
        let price = Price::brl(Decimal::new(14990, 2));
        assert_eq!(price.to_string(), "BRL 149.90");
    }

    #[test]
    fn test_decimal_exactness() {
        // 0.1 + 0.2 is exactly 0.3 in decimal arithmetic
        let a = Decimal::new(1, 1);
        let b = Decimal::new(2, 1);
        assert_eq!(a + b, Decimal::new(3, 1));
    }
}
