//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError (mizan-checkout) ← What the use-case caller sees        │
//! │                                                                         │
//! │  Conflict is special: mizan-checkout retries it a bounded number of    │
//! │  times with preconditions re-checked. Everything else surfaces.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second stock aggregate for the same (packaging, org, location)
    /// - Duplicate batch number within a stock
    /// - Duplicate sale number
    #[error("Duplicate {entity}: {message}")]
    UniqueViolation { entity: String, message: String },

    /// Optimistic concurrency conflict: the row's version moved between
    /// load and save. The caller re-loads, re-checks preconditions and
    /// retries a bounded number of times.
    #[error("Concurrent update on {entity} {id}, reload and retry")]
    Conflict { entity: String, id: String },

    /// The organization exists but has no base currency configured.
    #[error("Organization {0} has no base currency configured")]
    MissingBaseCurrency(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row cannot be mapped back into a domain value (corrupt
    /// decimal text, invariant violation on rehydration).
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error for a given entity type and ID.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the error is a retryable optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UniqueViolation {
                    entity: "row".to_string(),
                    message: db_err.message().to_string(),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::ConnectionFailed(err.to_string()),
            _ => DbError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Convenience type alias for Results with DbError.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        let err = DbError::conflict("Stock", "s-1");
        assert!(err.is_conflict());
        assert!(!DbError::not_found("Sale", "x").is_conflict());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DbError::not_found("Sale", "abc").to_string(),
            "Sale not found: abc"
        );
        assert_eq!(
            DbError::MissingBaseCurrency("org-1".to_string()).to_string(),
            "Organization org-1 has no base currency configured"
        );
    }
}
