//! # mizan-core: Pure Business Logic for Mizan POS
//!
//! This crate is the **heart** of Mizan POS. It contains the transaction
//! engine's business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                mizan-checkout (Use Cases)                       │   │
//! │  │   open_sale, add_line, apply_line_discount, complete_sale, ... │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   price   │  │ discount  │  │   sale    │  │   stock   │  │   │
//! │  │   │   Price   │  │ Discount  │  │   Sale    │  │   Stock   │  │   │
//! │  │   │ Currency  │  │  clamped  │  │ SaleItem  │  │StockBatch │  │   │
//! │  │   │   Code    │  │   math    │  │  states   │  │   FEFO    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │ currency  │  │   types   │  │ validation│                 │   │
//! │  │   │  RateSet  │  │ Packaging │  │   rules   │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mizan-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`price`] - Currency-tagged decimal amounts; cross-currency arithmetic
//!   is a typed error
//! - [`discount`] - Percentage and fixed discounts with clamped math
//! - [`currency`] - Pure conversion against pre-resolved rate sets
//! - [`sale`] - The sale aggregate: cart mutations, payments, lifecycle
//! - [`stock`] - The stock aggregate: batches, reservations, FEFO depletion
//! - [`types`] - Read-only collaborator types (product packaging)
//! - [`error`] - Domain error types
//! - [`validation`] - Shared field validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: aggregates never perform I/O; currency rates are
//!    resolved by the caller and passed in as plain values
//! 2. **Validating Constructors**: `Price::new`, `Discount::percentage`,
//!    `Sale::open` — invalid values cannot be constructed, so they cannot
//!    propagate
//! 3. **Derived Values Stay Derived**: line totals and stock quantities are
//!    recomputed from their inputs, never cached as independent state
//! 4. **Explicit Errors**: all failures are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod currency;
pub mod discount;
pub mod error;
pub mod price;
pub mod sale;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mizan_core::Price` instead of
// `use mizan_core::price::Price`

pub use currency::RateSet;
pub use discount::{Discount, DiscountKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use price::{CurrencyCode, Price};
pub use sale::{Sale, SaleItem, SaleStatus};
pub use stock::{BatchCondition, BatchDraw, Stock, StockBatch};
pub use types::ProductPackaging;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of distinct lines on a single sale.
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts printable. Merging quantity
/// into an existing line is always allowed, even at the cap.
pub const MAX_SALE_ITEMS: usize = 1000;
