//! # Currency Conversion Module
//!
//! Pure conversion math against a pre-resolved set of exchange rates.
//!
//! ## Where Rates Come From
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Rate Resolution Flow                                  │
//! │                                                                         │
//! │  Checkout use case (mizan-checkout)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RateCache / CurrencyRepository  ← the only place that does I/O        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RateSet { base, rate_to_base per currency }   (plain values)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sale::add_item(.., &rates)  ← aggregate recomputes totals             │
//! │       synchronously, no await, trivially testable                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Conversion between two non-base currencies always routes through the
//! base: `amount × rate(from→base) ÷ rate(to→base)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, ValidationError};
use crate::price::{CurrencyCode, Price};

// =============================================================================
// Rate Set
// =============================================================================

/// An organization's base currency plus the rate-to-base for every currency
/// it trades in. The base currency itself always converts at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSet {
    base: CurrencyCode,
    rates: HashMap<CurrencyCode, Decimal>,
}

impl RateSet {
    /// Creates a rate set with only the base currency.
    pub fn new(base: CurrencyCode) -> Self {
        RateSet {
            base,
            rates: HashMap::new(),
        }
    }

    /// Builder-style variant of [`RateSet::insert`].
    pub fn with_rate(mut self, currency: CurrencyCode, rate_to_base: Decimal) -> Result<Self, CoreError> {
        self.insert(currency, rate_to_base)?;
        Ok(self)
    }

    /// Registers the rate-to-base for a currency; the rate must be positive.
    pub fn insert(&mut self, currency: CurrencyCode, rate_to_base: Decimal) -> Result<(), CoreError> {
        if rate_to_base <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: "exchange rate".to_string(),
            }
            .into());
        }

        self.rates.insert(currency, rate_to_base);
        Ok(())
    }

    /// Returns the base currency.
    #[inline]
    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    /// The rate that converts one unit of `currency` into the base currency.
    ///
    /// ## Errors
    /// `UnknownCurrency` when no rate is configured — an unconfigured
    /// currency must never silently convert at 1.
    pub fn rate_to_base(&self, currency: &CurrencyCode) -> Result<Decimal, CoreError> {
        if currency == &self.base {
            return Ok(Decimal::ONE);
        }

        self.rates
            .get(currency)
            .copied()
            .ok_or_else(|| CoreError::UnknownCurrency {
                code: currency.to_string(),
            })
    }

    /// Converts an amount from `from` into the base currency.
    pub fn to_base(&self, amount: Decimal, from: &CurrencyCode) -> Result<Decimal, CoreError> {
        Ok(amount * self.rate_to_base(from)?)
    }

    /// Converts an amount between two currencies, routing through the base.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, CoreError> {
        if from == to {
            return Ok(amount);
        }

        let in_base = self.to_base(amount, from)?;
        Ok(in_base / self.rate_to_base(to)?)
    }

    /// Converts a whole price into the base currency.
    pub fn price_to_base(&self, price: &Price) -> Result<Price, CoreError> {
        let amount = self.to_base(price.amount(), price.currency())?;
        Ok(Price::raw(amount, self.base.clone()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c).unwrap()
    }

    fn rates() -> RateSet {
        // 1 USD = 1310 IQD, 1 EUR = 1420 IQD
        RateSet::new(code("IQD"))
            .with_rate(code("USD"), Decimal::from(1310))
            .unwrap()
            .with_rate(code("EUR"), Decimal::from(1420))
            .unwrap()
    }

    #[test]
    fn test_base_converts_at_one() {
        let r = rates();
        assert_eq!(r.to_base(Decimal::from(5000), &code("IQD")).unwrap(), Decimal::from(5000));
    }

    #[test]
    fn test_to_base() {
        let r = rates();
        assert_eq!(r.to_base(Decimal::from(2), &code("USD")).unwrap(), Decimal::from(2620));
    }

    #[test]
    fn test_convert_routes_through_base() {
        let r = rates();
        // 142 EUR → IQD → USD
        let usd = r
            .convert(Decimal::from(131), &code("EUR"), &code("USD"))
            .unwrap();
        assert_eq!(usd, Decimal::from(142));
    }

    #[test]
    fn test_unknown_currency_fails_loudly() {
        let r = rates();
        let err = r.to_base(Decimal::from(10), &code("GBP")).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCurrency { .. }));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let mut r = RateSet::new(code("IQD"));
        assert!(r.insert(code("USD"), Decimal::ZERO).is_err());
        assert!(r.insert(code("USD"), Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_price_to_base() {
        let r = rates();
        let p = Price::new(Decimal::from(3), "USD").unwrap();
        let in_base = r.price_to_base(&p).unwrap();
        assert_eq!(in_base.amount(), Decimal::from(3930));
        assert_eq!(in_base.currency().as_str(), "IQD");
    }
}
