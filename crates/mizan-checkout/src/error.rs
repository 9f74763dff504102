//! # Checkout Error Types
//!
//! What callers of the use-case layer see. Domain and database errors pass
//! through mostly untouched - they already carry their context - with a few
//! checkout-specific variants layered on top.

use thiserror::Error;

use mizan_core::CoreError;
use mizan_db::DbError;

/// Errors surfaced by checkout use cases.
///
/// Business-rule violations are never retried here; the only failure the
/// service retries internally is an optimistic-concurrency conflict, and
/// when the retry budget runs out it surfaces as [`CheckoutError::Contention`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule violation from the domain layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Sale, packaging or stock the request referenced does not exist (or
    /// belongs to a different organization, which looks the same from the
    /// caller's side).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The packaging exists but is not sellable.
    #[error("Product packaging {id} is not available for sale")]
    InactivePackaging { id: String },

    /// The location cannot cover the requested line quantity.
    ///
    /// Carries the available amount so the till can show "only N left".
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The operation kept losing the optimistic-concurrency race after the
    /// configured number of attempts.
    #[error("{entity} {id} kept conflicting after {attempts} attempts")]
    Contention {
        entity: &'static str,
        id: String,
        attempts: u32,
    },
}

/// Convenience type alias for Results with CheckoutError.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_carries_available() {
        let err = CheckoutError::InsufficientStock {
            product_name: "Paracetamol 500mg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Paracetamol 500mg: available 3, requested 5"
        );
    }

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let core = CoreError::EmptySale {
            sale_id: "s-1".to_string(),
        };
        let message = core.to_string();
        let wrapped: CheckoutError = core.into();
        assert_eq!(wrapped.to_string(), message);
    }
}
