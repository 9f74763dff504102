//! # mizan-db: Database Layer for Mizan POS
//!
//! This crate provides database access for the Mizan POS transaction
//! engine. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan POS Data Flow                              │
//! │                                                                         │
//! │  Checkout use case (complete_sale)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mizan-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (sale.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │   stock.rs,   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│   packaging,  │    │ 0001_initial │  │   │
//! │  │   │ one-tx commit │    │   currency)   │    │  _schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (file with WAL, or in-memory for tests)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, one-transaction completion
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, stock, packaging,
//!   currency)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/mizan.db")).await?;
//! let stock = db.stocks().find(&pkg_id, &org_id, &loc_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::currency::CurrencyRepository;
pub use repository::packaging::PackagingRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
