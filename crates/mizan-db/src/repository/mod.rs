//! # Repository Module
//!
//! Database repository implementations for Mizan POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Checkout use case                                                     │
//! │       │                                                                 │
//! │       │  db.stocks().find(pkg, org, loc)                               │
//! │       ▼                                                                 │
//! │  StockRepository                                                       │
//! │  ├── find / get          load the aggregate WITH its batches           │
//! │  ├── insert              first receipt creates the aggregate           │
//! │  └── save / save_in      version-checked write, optionally inside a    │
//! │                          caller-owned transaction                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite rows ←→ mizan-core aggregates                                  │
//! │                                                                         │
//! │  Row structs stay private to each repository; domain types are the     │
//! │  only thing that crosses the crate boundary. Decimal amounts travel    │
//! │  as TEXT and are re-validated through the domain constructors on the   │
//! │  way back in.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sale::SaleRepository`] - Sales with their line items
//! - [`stock::StockRepository`] - Stock aggregates with their batches
//! - [`packaging::PackagingRepository`] - Catalog lookups by id or barcode
//! - [`currency::CurrencyRepository`] - Base currency + exchange rates

pub mod currency;
pub mod packaging;
pub mod sale;
pub mod stock;

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Parses a TEXT-stored decimal, attributing failures to a named column.
pub(crate) fn parse_decimal(value: &str, column: &str) -> DbResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| DbError::Internal(format!("invalid decimal in {column}: {e}")))
}

/// Maps a domain rehydration failure into an internal database error:
/// stored rows violating domain invariants mean corrupt data, not bad input.
pub(crate) fn corrupt(err: impl std::fmt::Display) -> DbError {
    DbError::Internal(format!("stored row failed domain validation: {err}"))
}
