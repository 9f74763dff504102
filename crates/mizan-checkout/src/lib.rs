//! # mizan-checkout: Transaction Orchestration for Mizan POS
//!
//! The use-case layer sitting between any transport (HTTP, RPC, a desktop
//! shell) and the domain core. Each public method on [`CheckoutService`]
//! is one atomic unit of work:
//!
//! - [`CheckoutService::open_sale`] - fetch or create the cashier's cart
//! - [`CheckoutService::add_line`] / [`CheckoutService::update_line_quantity`]
//!   / [`CheckoutService::remove_line`] - cart mutations with availability
//!   checks
//! - [`CheckoutService::apply_line_discount`] - validated line discounts
//! - [`CheckoutService::record_payment`] - partial payments
//! - [`CheckoutService::complete_sale`] - payment + FEFO stock deduction +
//!   sale completion in one transaction
//! - [`CheckoutService::cancel_sale`] - abandon an unpaid cart
//! - [`CheckoutService::receive_stock`] / [`CheckoutService::reserve_stock`]
//!   / [`CheckoutService::release_stock`] - batch-level inventory operations
//!
//! ## Design Rules
//!
//! 1. Currency rates are resolved (and cached with a bounded TTL) BEFORE
//!    any aggregate method runs; aggregates never do I/O.
//! 2. Domain errors surface synchronously and are never retried; the only
//!    retried failure is an optimistic-concurrency version conflict, a
//!    bounded number of times, with every precondition re-checked against
//!    freshly loaded state.
//! 3. Nothing is durably committed unless the whole operation succeeds.

pub mod error;
pub mod rates;
pub mod service;

pub use error::{CheckoutError, CheckoutResult};
pub use rates::RateCache;
pub use service::{
    CallerContext, CheckoutConfig, CheckoutService, CompletedSale, DiscountRequest, LineDeduction,
    NewBatch,
};
