//! # Error Types
//!
//! Domain-specific error types for mizan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mizan-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mizan-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mizan-checkout errors (separate crate)                                │
//! │  └── CheckoutError    - What the caller of a use case sees             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → boundary          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts, currency codes)
//! 3. Errors are enum variants, never String
//! 4. Business-rule violations are never retried; they surface to the caller

use rust_decimal::Decimal;
use thiserror::Error;

use crate::sale::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages at the
/// boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An entity cannot be found.
    ///
    /// ## When This Occurs
    /// - A sale item id is absent from the sale
    /// - A batch id is absent from the stock aggregate
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requested quantity exceeds what is available.
    ///
    /// ## When This Occurs
    /// - Adding a cart line beyond the location's available quantity
    /// - FEFO deduction that cannot be covered by sellable batches
    /// - Removing or reserving more than a single batch has available
    ///
    /// Always carries the available amount so the caller can show it.
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// Releasing more than is currently reserved on a batch.
    #[error("Cannot release {requested}: only {reserved} reserved")]
    ReleaseExceedsReservation { reserved: i64, requested: i64 },

    /// Arithmetic across incompatible currencies.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// A currency code has no configured conversion rate.
    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    /// The organization has no base currency configured.
    #[error("Organization {organization_id} has no base currency configured")]
    MissingBaseCurrency { organization_id: String },

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding items to a completed or cancelled sale
    /// - Completing a cancelled sale
    /// - Cancelling a completed sale
    #[error("Sale {sale_id} is {status:?}, cannot {operation}")]
    InvalidSaleStatus {
        sale_id: String,
        status: SaleStatus,
        operation: &'static str,
    },

    /// Completing a sale that has no items.
    #[error("Sale {sale_id} has no items, cannot complete")]
    EmptySale { sale_id: String },

    /// Completing a sale whose grand total is not positive.
    #[error("Sale {sale_id} has a non-positive total, cannot complete")]
    ZeroTotal { sale_id: String },

    /// Completing a sale that has not been fully paid.
    #[error("Sale {sale_id} is underpaid: paid {amount_paid} of {grand_total}")]
    Underpaid {
        sale_id: String,
        amount_paid: Decimal,
        grand_total: Decimal,
    },

    /// A payment that would push the paid amount past the grand total.
    #[error(
        "Payment of {attempted} would exceed grand total {grand_total} (already paid {amount_paid})"
    )]
    Overpayment {
        sale_id: String,
        attempted: Decimal,
        amount_paid: Decimal,
        grand_total: Decimal,
    },

    /// Cancelling a sale that has recorded payments.
    #[error("Sale {sale_id} has recorded payments; refund before cancelling")]
    CancelWithPayments { sale_id: String },

    /// Sale has exceeded the maximum allowed number of lines.
    #[error("Sale cannot have more than {max} items")]
    SaleTooLarge { max: usize },

    /// Deleting a batch that still has reserved quantity.
    #[error("Batch {batch_number} has {reserved} reserved units, cannot remove")]
    BatchReserved { batch_number: String, reserved: i64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet shape or bounds requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate batch number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            available: 8,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock: available 8, requested 10"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "batch_number".to_string(),
        };
        assert_eq!(err.to_string(), "batch_number is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "currency".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_invalid_status_message_names_operation() {
        let err = CoreError::InvalidSaleStatus {
            sale_id: "s-1".to_string(),
            status: SaleStatus::Completed,
            operation: "add item",
        };
        assert_eq!(err.to_string(), "Sale s-1 is Completed, cannot add item");
    }
}
