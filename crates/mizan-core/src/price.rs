//! # Price Module
//!
//! Provides the `Price` type: a decimal amount tagged with its currency.
//!
//! ## Why Currency-Tagged Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE MIXED-CURRENCY PROBLEM                                             │
//! │                                                                         │
//! │  One receipt can carry lines priced in different currencies:            │
//! │    Line 1: 5 × 1,000 IQD                                               │
//! │    Line 2: 2 × 3.50 USD                                                │
//! │                                                                         │
//! │  Adding 5,000 + 7.00 as bare numbers silently produces garbage.        │
//! │                                                                         │
//! │  OUR SOLUTION: every amount carries its currency, and arithmetic       │
//! │  between different currencies is a typed error, never a silent sum.    │
//! │  Cross-currency totals only exist after explicit conversion through    │
//! │  the organization's base currency (see the `currency` module).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mizan_core::price::Price;
//! use rust_decimal::Decimal;
//!
//! let unit = Price::new(Decimal::from(1000), "IQD").unwrap();
//! let line = unit.multiply(5);
//! assert_eq!(line.amount(), Decimal::from(5000));
//!
//! // Mismatched currencies fail loudly:
//! let usd = Price::new(Decimal::from(7), "USD").unwrap();
//! assert!(line.try_add(&usd).is_err());
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, ValidationError};
use crate::validation::validate_currency_code;

// =============================================================================
// Currency Code
// =============================================================================

/// A 3-letter ISO 4217 currency code, normalised to uppercase.
///
/// Construction validates the shape, so a `CurrencyCode` in hand is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a currency code, normalising to uppercase.
    ///
    /// ## Example
    /// ```rust
    /// use mizan_core::price::CurrencyCode;
    ///
    /// let iqd = CurrencyCode::new("iqd").unwrap();
    /// assert_eq!(iqd.as_str(), "IQD");
    /// assert!(CurrencyCode::new("DINAR").is_err());
    /// ```
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        Ok(CurrencyCode(validate_currency_code(code)?))
    }

    /// Returns the code as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

// =============================================================================
// Price
// =============================================================================

/// A non-negative monetary amount in a specific currency.
///
/// ## Design Decisions
/// - **Decimal, not float**: exact arithmetic for financial values
/// - **Non-negative**: refund flows are out of scope for the sale engine;
///   subtraction that would go negative is an error, not a negative price
/// - **Private fields**: construction always passes validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Price {
    /// Creates a price from an amount and a currency code.
    ///
    /// ## Errors
    /// - Negative amount
    /// - Malformed currency code
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, CoreError> {
        let currency = CurrencyCode::new(currency)?;
        Self::with_currency(amount, currency)
    }

    /// Creates a price from an amount and an already-validated currency.
    pub fn with_currency(amount: Decimal, currency: CurrencyCode) -> Result<Self, CoreError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::MustBeNonNegative {
                field: "amount".to_string(),
            }
            .into());
        }

        Ok(Price { amount, currency })
    }

    /// Internal constructor for amounts the caller has already proven
    /// non-negative (derived totals, clamped discounts).
    pub(crate) fn raw(amount: Decimal, currency: CurrencyCode) -> Self {
        debug_assert!(!amount.is_sign_negative() || amount.is_zero());
        Price { amount, currency }
    }

    /// Zero in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Price {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns the amount.
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency.
    #[inline]
    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Checks if the amount is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Adds two prices of the same currency.
    ///
    /// ## Errors
    /// `CurrencyMismatch` when the currencies differ.
    pub fn try_add(&self, other: &Price) -> Result<Price, CoreError> {
        self.ensure_same_currency(other)?;
        Ok(Price::raw(self.amount + other.amount, self.currency.clone()))
    }

    /// Subtracts a price of the same currency.
    ///
    /// ## Errors
    /// - `CurrencyMismatch` when the currencies differ
    /// - A result below zero is rejected; prices never go negative
    pub fn try_sub(&self, other: &Price) -> Result<Price, CoreError> {
        self.ensure_same_currency(other)?;

        if other.amount > self.amount {
            return Err(ValidationError::MustBeNonNegative {
                field: "amount".to_string(),
            }
            .into());
        }

        Ok(Price::raw(self.amount - other.amount, self.currency.clone()))
    }

    /// Multiplies the price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use mizan_core::price::Price;
    /// use rust_decimal::Decimal;
    ///
    /// let unit = Price::new(Decimal::from(1000), "IQD").unwrap();
    /// assert_eq!(unit.multiply(3).amount(), Decimal::from(3000));
    /// ```
    pub fn multiply(&self, qty: i64) -> Price {
        debug_assert!(qty >= 0);
        Price::raw(self.amount * Decimal::from(qty), self.currency.clone())
    }

    fn ensure_same_currency(&self, other: &Price) -> Result<(), CoreError> {
        if self.currency != other.currency {
            return Err(CoreError::CurrencyMismatch {
                expected: self.currency.to_string(),
                actual: other.currency.to_string(),
            });
        }
        Ok(())
    }
}

/// Display implementation shows the amount with its currency code.
///
/// ## Note
/// This is for logs and debugging. UI formatting (locale, minor units)
/// lives outside this crate.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn iqd(amount: i64) -> Price {
        Price::new(Decimal::from(amount), "IQD").unwrap()
    }

    #[test]
    fn test_new_rejects_negative() {
        assert!(Price::new(Decimal::from(-1), "IQD").is_err());
        assert!(Price::new(Decimal::ZERO, "IQD").is_ok());
    }

    #[test]
    fn test_new_rejects_bad_currency() {
        assert!(Price::new(Decimal::from(10), "DINAR").is_err());
        assert!(Price::new(Decimal::from(10), "").is_err());
    }

    #[test]
    fn test_currency_is_normalised() {
        let p = Price::new(Decimal::from(10), "usd").unwrap();
        assert_eq!(p.currency().as_str(), "USD");
    }

    #[test]
    fn test_try_add_same_currency() {
        let total = iqd(1000).try_add(&iqd(500)).unwrap();
        assert_eq!(total.amount(), Decimal::from(1500));
    }

    #[test]
    fn test_try_add_mismatched_currency_fails() {
        let usd = Price::new(Decimal::from(5), "USD").unwrap();
        let err = iqd(1000).try_add(&usd).unwrap_err();
        assert!(matches!(err, CoreError::CurrencyMismatch { .. }));
    }

    #[test]
    fn test_try_sub_cannot_go_negative() {
        assert!(iqd(500).try_sub(&iqd(1000)).is_err());
        let zero = iqd(500).try_sub(&iqd(500)).unwrap();
        assert!(zero.is_zero());
    }

    #[test]
    fn test_multiply() {
        assert_eq!(iqd(1000).multiply(5).amount(), Decimal::from(5000));
        assert_eq!(iqd(1000).multiply(0).amount(), Decimal::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", iqd(1500)), "1500 IQD");
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = iqd(1099);
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_currency_code_serde_rejects_garbage() {
        let parsed: Result<CurrencyCode, _> = serde_json::from_str("\"not-a-code\"");
        assert!(parsed.is_err());
    }
}
