//! # Discount Module
//!
//! Percentage and fixed-amount discounts applied to a base price.
//!
//! Discount math is pure: `amount_off` and `apply_to` never mutate and a
//! fixed discount is clamped so it can never exceed the base price. A
//! 150-off discount on a 100 base yields a total of exactly zero, not a
//! negative price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::price::Price;

// =============================================================================
// Discount Kind
// =============================================================================

/// The kind of discount applied to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// No discount.
    #[default]
    None,
    /// Percentage of the base amount, in `[0, 100]`.
    Percentage,
    /// Absolute amount in the base price's currency, clamped to the base.
    FixedAmount,
}

// =============================================================================
// Discount
// =============================================================================

/// A validated discount value.
///
/// Constructed through [`Discount::none`], [`Discount::percentage`] or
/// [`Discount::fixed_amount`]; the bounds checks cannot be skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    kind: DiscountKind,
    value: Decimal,
}

impl Discount {
    /// The absent discount.
    pub fn none() -> Self {
        Discount {
            kind: DiscountKind::None,
            value: Decimal::ZERO,
        }
    }

    /// A percentage discount; `value` must be in `[0, 100]`.
    ///
    /// ## Example
    /// ```rust
    /// use mizan_core::discount::Discount;
    /// use rust_decimal::Decimal;
    ///
    /// assert!(Discount::percentage(Decimal::from(10)).is_ok());
    /// assert!(Discount::percentage(Decimal::from(101)).is_err());
    /// ```
    pub fn percentage(value: Decimal) -> Result<Self, CoreError> {
        if value < Decimal::ZERO || value > Decimal::from(100) {
            return Err(ValidationError::OutOfRange {
                field: "discount percentage".to_string(),
                min: 0,
                max: 100,
            }
            .into());
        }

        Ok(Discount {
            kind: DiscountKind::Percentage,
            value,
        })
    }

    /// A fixed-amount discount; `value` must be `>= 0`.
    pub fn fixed_amount(value: Decimal) -> Result<Self, CoreError> {
        if value < Decimal::ZERO {
            return Err(ValidationError::MustBeNonNegative {
                field: "discount amount".to_string(),
            }
            .into());
        }

        Ok(Discount {
            kind: DiscountKind::FixedAmount,
            value,
        })
    }

    /// Rebuilds a discount from stored parts, re-running the bounds checks.
    pub fn from_stored(kind: DiscountKind, value: Decimal) -> Result<Self, CoreError> {
        match kind {
            DiscountKind::None => Ok(Discount::none()),
            DiscountKind::Percentage => Discount::percentage(value),
            DiscountKind::FixedAmount => Discount::fixed_amount(value),
        }
    }

    /// Returns the discount kind.
    #[inline]
    pub fn kind(&self) -> DiscountKind {
        self.kind
    }

    /// Returns the raw discount value.
    #[inline]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Checks whether this is the absent discount.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.kind == DiscountKind::None
    }

    /// The amount taken off the given base price, in the base's currency.
    ///
    /// A fixed discount is capped at the base amount, so the result is
    /// always in `[0, base]`.
    pub fn amount_off(&self, base: &Price) -> Price {
        let off = match self.kind {
            DiscountKind::None => Decimal::ZERO,
            DiscountKind::Percentage => base.amount() * self.value / Decimal::from(100),
            DiscountKind::FixedAmount => self.value.min(base.amount()),
        };

        Price::raw(off, base.currency().clone())
    }

    /// The base price after this discount.
    ///
    /// ## Example
    /// ```rust
    /// use mizan_core::discount::Discount;
    /// use mizan_core::price::Price;
    /// use rust_decimal::Decimal;
    ///
    /// let base = Price::new(Decimal::from(100), "IQD").unwrap();
    /// let ten_pct = Discount::percentage(Decimal::from(10)).unwrap();
    /// assert_eq!(ten_pct.apply_to(&base).amount(), Decimal::from(90));
    /// ```
    pub fn apply_to(&self, base: &Price) -> Price {
        let off = self.amount_off(base);
        // amount_off is clamped to the base, so this cannot underflow
        Price::raw(base.amount() - off.amount(), base.currency().clone())
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
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
    fn test_percentage_bounds() {
        assert!(Discount::percentage(Decimal::ZERO).is_ok());
        assert!(Discount::percentage(Decimal::from(100)).is_ok());
        assert!(Discount::percentage(Decimal::from(101)).is_err());
        assert!(Discount::percentage(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_fixed_amount_bounds() {
        assert!(Discount::fixed_amount(Decimal::ZERO).is_ok());
        assert!(Discount::fixed_amount(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_percentage_apply() {
        let ten_pct = Discount::percentage(Decimal::from(10)).unwrap();
        assert_eq!(ten_pct.apply_to(&iqd(100)), iqd(90));
        assert_eq!(ten_pct.amount_off(&iqd(100)), iqd(10));
    }

    #[test]
    fn test_fixed_amount_is_clamped_to_base() {
        // A 150-off discount on a 100 base caps at 100, total 0
        let off = Discount::fixed_amount(Decimal::from(150)).unwrap();
        assert_eq!(off.amount_off(&iqd(100)), iqd(100));
        assert_eq!(off.apply_to(&iqd(100)), iqd(0));
    }

    #[test]
    fn test_none_is_identity() {
        let none = Discount::none();
        assert_eq!(none.apply_to(&iqd(1234)), iqd(1234));
        assert!(none.amount_off(&iqd(1234)).is_zero());
    }

    #[test]
    fn test_full_percentage_zeroes_the_base() {
        let all = Discount::percentage(Decimal::from(100)).unwrap();
        assert_eq!(all.apply_to(&iqd(777)), iqd(0));
    }

    #[test]
    fn test_from_stored_revalidates() {
        assert!(Discount::from_stored(DiscountKind::Percentage, Decimal::from(250)).is_err());
        assert!(Discount::from_stored(DiscountKind::FixedAmount, Decimal::from(250)).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The discounted amount never exceeds the base, and the total
            /// after discount is never negative.
            #[test]
            fn discount_never_exceeds_base(base in 0i64..1_000_000, pct in 0i64..=100) {
                let price = iqd(base);
                let discount = Discount::percentage(Decimal::from(pct)).unwrap();
                let off = discount.amount_off(&price);
                prop_assert!(off.amount() <= price.amount());
                prop_assert!(discount.apply_to(&price).amount() >= Decimal::ZERO);
            }

            #[test]
            fn fixed_discount_clamps(base in 0i64..1_000_000, off in 0i64..2_000_000) {
                let price = iqd(base);
                let discount = Discount::fixed_amount(Decimal::from(off)).unwrap();
                let taken = discount.amount_off(&price);
                prop_assert!(taken.amount() <= price.amount());
                // off plus remainder reconstructs the base exactly
                let total = discount.apply_to(&price).try_add(&taken).unwrap();
                prop_assert_eq!(total, price);
            }
        }
    }
}
