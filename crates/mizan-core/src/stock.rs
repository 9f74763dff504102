//! # Stock Aggregate
//!
//! Batch-tracked inventory for one product packaging at one location, and
//! the FEFO (First-Expired-First-Out) depletion engine.
//!
//! ## FEFO Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     FEFO Depletion Order                                │
//! │                                                                         │
//! │  Batches:   B1(exp 2025-01-01, avail 5)                                │
//! │             B2(exp 2025-03-01, avail 5)                                │
//! │             B3(no expiry,      avail 5)                                │
//! │                                                                         │
//! │  Need 7 units:                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  available_batches() → [B1, B2, B3]   (no-expiry sorts last)           │
//! │       │                                                                 │
//! │       ├── take 5 from B1 (exhausted)                                   │
//! │       ├── take 2 from B2                                               │
//! │       └── B3 untouched                                                 │
//! │                                                                         │
//! │  Equal expiries keep batch-creation order (stable sort), so two        │
//! │  runs over the same stock always pick the same batch first.            │
//! │                                                                         │
//! │  If the sellable batches cannot cover the request, NOTHING is          │
//! │  deducted: the full plan is computed first, then applied.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reservations hold quantity without removing it: `available = quantity −
//! reserved`. Expired batches stay on the aggregate (they still count in
//! `total_quantity`) but are invisible to FEFO.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, ValidationError};
use crate::validation::{validate_batch_number, validate_batch_quantity, validate_quantity};

// =============================================================================
// Batch Condition
// =============================================================================

/// Physical condition of a received batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BatchCondition {
    /// Sellable as received.
    #[default]
    Good,
    /// Damaged in transit or storage.
    Damaged,
    /// Held pending inspection.
    Quarantined,
}

// =============================================================================
// Stock Batch
// =============================================================================

/// A quantity of one product packaging received together, with its own
/// expiry, condition and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBatch {
    id: String,
    stock_id: String,
    batch_number: String,
    quantity: i64,
    reserved_quantity: i64,
    expiry_date: Option<NaiveDate>,
    condition: BatchCondition,
    cost_price: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl StockBatch {
    fn new(
        stock_id: &str,
        batch_number: &str,
        quantity: i64,
        expiry_date: Option<NaiveDate>,
        condition: BatchCondition,
        cost_price: Option<Decimal>,
    ) -> Result<Self, CoreError> {
        validate_batch_number(batch_number)?;
        validate_batch_quantity(quantity)?;

        if let Some(cost) = cost_price {
            if cost < Decimal::ZERO {
                return Err(ValidationError::MustBeNonNegative {
                    field: "cost_price".to_string(),
                }
                .into());
            }
        }

        Ok(StockBatch {
            id: Uuid::new_v4().to_string(),
            stock_id: stock_id.to_string(),
            batch_number: batch_number.to_string(),
            quantity,
            reserved_quantity: 0,
            expiry_date,
            condition,
            cost_price,
            created_at: Utc::now(),
        })
    }

    /// Rebuilds a batch from storage, re-running the invariant checks.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: String,
        stock_id: String,
        batch_number: String,
        quantity: i64,
        reserved_quantity: i64,
        expiry_date: Option<NaiveDate>,
        condition: BatchCondition,
        cost_price: Option<Decimal>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        validate_batch_quantity(quantity)?;

        if reserved_quantity < 0 || reserved_quantity > quantity {
            return Err(ValidationError::OutOfRange {
                field: "reserved_quantity".to_string(),
                min: 0,
                max: quantity,
            }
            .into());
        }

        Ok(StockBatch {
            id,
            stock_id,
            batch_number,
            quantity,
            reserved_quantity,
            expiry_date,
            condition,
            cost_price,
            created_at,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn stock_id(&self) -> &str {
        &self.stock_id
    }

    #[inline]
    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn reserved_quantity(&self) -> i64 {
        self.reserved_quantity
    }

    #[inline]
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    #[inline]
    pub fn condition(&self) -> BatchCondition {
        self.condition
    }

    #[inline]
    pub fn cost_price(&self) -> Option<Decimal> {
        self.cost_price
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Quantity not held by a reservation: `quantity − reserved`.
    #[inline]
    pub fn available_quantity(&self) -> i64 {
        self.quantity - self.reserved_quantity
    }

    /// A batch is expired strictly after its expiry date: it is still
    /// sellable on the expiry date itself.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry < today,
            None => false,
        }
    }

    /// Expires within `days_threshold` days of `today` (and not yet expired).
    pub fn is_near_expiry(&self, today: NaiveDate, days_threshold: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry >= today && expiry <= today + Duration::days(days_threshold),
            None => false,
        }
    }
}

// =============================================================================
// Batch Draw
// =============================================================================

/// One step of a FEFO deduction plan: take `quantity` from `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDraw {
    pub batch_id: String,
    pub batch_number: String,
    pub quantity: i64,
}

// =============================================================================
// Stock
// =============================================================================

/// The stock aggregate root: all batches for one (product packaging,
/// location) pair within an organization.
///
/// The aggregated quantities are always derived by summing batches — never
/// cached as independent state. Exactly one Stock exists per
/// (packaging, organization, location); the checkout orchestrator rejects
/// duplicates on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    id: String,
    product_packaging_id: String,
    organization_id: String,
    inventory_location_id: String,
    batches: Vec<StockBatch>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Stock {
    /// Creates an empty stock aggregate for a (packaging, location) pair.
    pub fn create(
        product_packaging_id: &str,
        organization_id: &str,
        inventory_location_id: &str,
    ) -> Self {
        let now = Utc::now();

        Stock {
            id: Uuid::new_v4().to_string(),
            product_packaging_id: product_packaging_id.to_string(),
            organization_id: organization_id.to_string(),
            inventory_location_id: inventory_location_id.to_string(),
            batches: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a stock aggregate from storage.
    ///
    /// `batches` must be in creation order — FEFO tie-breaking depends on it.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: String,
        product_packaging_id: String,
        organization_id: String,
        inventory_location_id: String,
        batches: Vec<StockBatch>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Stock {
            id,
            product_packaging_id,
            organization_id,
            inventory_location_id,
            batches,
            version,
            created_at,
            updated_at,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn product_packaging_id(&self) -> &str {
        &self.product_packaging_id
    }

    #[inline]
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    #[inline]
    pub fn inventory_location_id(&self) -> &str {
        &self.inventory_location_id
    }

    /// All batches in creation order, including expired and empty ones.
    #[inline]
    pub fn batches(&self) -> &[StockBatch] {
        &self.batches
    }

    #[inline]
    pub fn version(&self) -> i64 {
        self.version
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Total physical quantity across all batches.
    pub fn total_quantity(&self) -> i64 {
        self.batches.iter().map(|b| b.quantity).sum()
    }

    /// Total reserved quantity across all batches.
    pub fn total_reserved_quantity(&self) -> i64 {
        self.batches.iter().map(|b| b.reserved_quantity).sum()
    }

    /// Total unreserved quantity across all batches.
    pub fn total_available_quantity(&self) -> i64 {
        self.batches.iter().map(|b| b.available_quantity()).sum()
    }

    /// Unreserved quantity FEFO can actually draw from: available and not
    /// expired as of `today`.
    pub fn sellable_quantity(&self, today: NaiveDate) -> i64 {
        self.available_batches(today)
            .map(|b| b.available_quantity())
            .sum()
    }

    // -------------------------------------------------------------------------
    // Derived Queries
    // -------------------------------------------------------------------------

    pub fn is_out_of_stock(&self) -> bool {
        self.total_available_quantity() == 0
    }

    /// At or below the reorder level.
    pub fn is_low_stock(&self, reorder_level: i64) -> bool {
        self.total_available_quantity() <= reorder_level
    }

    pub fn has_expired_batches(&self, today: NaiveDate) -> bool {
        self.batches.iter().any(|b| b.is_expired(today))
    }

    pub fn has_near_expiry_batches(&self, today: NaiveDate, days_threshold: i64) -> bool {
        self.batches
            .iter()
            .any(|b| b.is_near_expiry(today, days_threshold))
    }

    // -------------------------------------------------------------------------
    // Batch Management
    // -------------------------------------------------------------------------

    /// Registers a newly received batch.
    ///
    /// ## Errors
    /// - Duplicate `batch_number` within this stock
    /// - Negative quantity or cost
    pub fn add_batch(
        &mut self,
        batch_number: &str,
        quantity: i64,
        expiry_date: Option<NaiveDate>,
        condition: BatchCondition,
        cost_price: Option<Decimal>,
    ) -> Result<&StockBatch, CoreError> {
        if self
            .batches
            .iter()
            .any(|b| b.batch_number == batch_number)
        {
            return Err(ValidationError::Duplicate {
                field: "batch_number".to_string(),
                value: batch_number.to_string(),
            }
            .into());
        }

        let batch = StockBatch::new(
            &self.id,
            batch_number,
            quantity,
            expiry_date,
            condition,
            cost_price,
        )?;
        self.batches.push(batch);
        self.updated_at = Utc::now();

        Ok(self.batches.last().expect("batch just pushed"))
    }

    /// Removes an empty-of-reservations batch from the aggregate.
    pub fn remove_batch(&mut self, batch_id: &str) -> Result<StockBatch, CoreError> {
        let position = self
            .batches
            .iter()
            .position(|b| b.id == batch_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "stock batch",
                id: batch_id.to_string(),
            })?;

        if self.batches[position].reserved_quantity > 0 {
            return Err(CoreError::BatchReserved {
                batch_number: self.batches[position].batch_number.clone(),
                reserved: self.batches[position].reserved_quantity,
            });
        }

        self.updated_at = Utc::now();
        Ok(self.batches.remove(position))
    }

    /// Batches FEFO may draw from, in depletion order: available quantity
    /// above zero, not expired, soonest expiry first, no-expiry batches
    /// last. Equal expiries keep batch-creation order.
    pub fn available_batches(&self, today: NaiveDate) -> impl Iterator<Item = &StockBatch> + '_ {
        let mut sellable: Vec<&StockBatch> = self
            .batches
            .iter()
            .filter(|b| b.available_quantity() > 0 && !b.is_expired(today))
            .collect();

        // stable sort: ties keep the creation order of `batches`
        sellable.sort_by_key(|b| b.expiry_date.unwrap_or(NaiveDate::MAX));
        sellable.into_iter()
    }

    // -------------------------------------------------------------------------
    // Quantity Mutations
    // -------------------------------------------------------------------------

    /// Physically removes quantity from one batch.
    pub fn remove_quantity(&mut self, batch_id: &str, quantity: i64) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        let batch = self.batch_mut(batch_id)?;
        if quantity > batch.available_quantity() {
            return Err(CoreError::InsufficientStock {
                available: batch.available_quantity(),
                requested: quantity,
            });
        }

        batch.quantity -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Adds received quantity onto an existing batch.
    pub fn add_quantity(&mut self, batch_id: &str, quantity: i64) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        let batch = self.batch_mut(batch_id)?;
        batch.quantity += quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Places a hold on batch quantity without removing it.
    pub fn reserve(&mut self, batch_id: &str, quantity: i64) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        let batch = self.batch_mut(batch_id)?;
        if quantity > batch.available_quantity() {
            return Err(CoreError::InsufficientStock {
                available: batch.available_quantity(),
                requested: quantity,
            });
        }

        batch.reserved_quantity += quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Releases a previously placed hold.
    pub fn release_reservation(&mut self, batch_id: &str, quantity: i64) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        let batch = self.batch_mut(batch_id)?;
        if quantity > batch.reserved_quantity {
            return Err(CoreError::ReleaseExceedsReservation {
                reserved: batch.reserved_quantity,
                requested: quantity,
            });
        }

        batch.reserved_quantity -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // FEFO Deduction
    // -------------------------------------------------------------------------

    /// Computes the batch-by-batch FEFO plan for `required` units WITHOUT
    /// mutating anything.
    ///
    /// ## Errors
    /// `InsufficientStock` (carrying the sellable amount) when the sellable
    /// batches cannot cover the request — in that case no plan exists and
    /// the caller must not deduct anything.
    pub fn plan_fefo(&self, required: i64, today: NaiveDate) -> Result<Vec<BatchDraw>, CoreError> {
        validate_quantity(required)?;

        let mut remaining = required;
        let mut plan = Vec::new();

        for batch in self.available_batches(today) {
            if remaining == 0 {
                break;
            }

            let draw = remaining.min(batch.available_quantity());
            plan.push(BatchDraw {
                batch_id: batch.id.clone(),
                batch_number: batch.batch_number.clone(),
                quantity: draw,
            });
            remaining -= draw;
        }

        if remaining > 0 {
            return Err(CoreError::InsufficientStock {
                available: self.sellable_quantity(today),
                requested: required,
            });
        }

        Ok(plan)
    }

    /// Plans and applies a FEFO deduction as one in-memory step: either the
    /// whole requirement is deducted or nothing is.
    pub fn deduct_fefo(
        &mut self,
        required: i64,
        today: NaiveDate,
    ) -> Result<Vec<BatchDraw>, CoreError> {
        let plan = self.plan_fefo(required, today)?;

        for draw in &plan {
            self.remove_quantity(&draw.batch_id, draw.quantity)?;
        }

        Ok(plan)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn batch_mut(&mut self, batch_id: &str) -> Result<&mut StockBatch, CoreError> {
        self.batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "stock batch",
                id: batch_id.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stock_with_batches(specs: &[(&str, i64, Option<NaiveDate>)]) -> Stock {
        let mut stock = Stock::create("pkg-1", "org-1", "loc-1");
        for (number, qty, expiry) in specs {
            stock
                .add_batch(number, *qty, *expiry, BatchCondition::Good, None)
                .unwrap();
        }
        stock
    }

    #[test]
    fn test_add_batch_rejects_duplicates() {
        let mut stock = Stock::create("pkg-1", "org-1", "loc-1");
        stock
            .add_batch("LOT-1", 10, None, BatchCondition::Good, None)
            .unwrap();
        let err = stock
            .add_batch("LOT-1", 5, None, BatchCondition::Good, None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_aggregated_quantities_are_sums() {
        let mut stock = stock_with_batches(&[("A", 10, None), ("B", 5, None)]);
        stock.reserve(&stock.batches()[0].id().to_string(), 4).unwrap();

        assert_eq!(stock.total_quantity(), 15);
        assert_eq!(stock.total_reserved_quantity(), 4);
        assert_eq!(stock.total_available_quantity(), 11);
    }

    #[test]
    fn test_fefo_order_soonest_expiry_first_no_expiry_last() {
        let today = date(2024, 6, 1);
        let stock = stock_with_batches(&[
            ("B3", 5, None),
            ("B2", 5, Some(date(2025, 3, 1))),
            ("B1", 5, Some(date(2025, 1, 1))),
        ]);

        let order: Vec<&str> = stock
            .available_batches(today)
            .map(|b| b.batch_number())
            .collect();
        assert_eq!(order, vec!["B1", "B2", "B3"]);
    }

    #[test]
    fn test_fefo_ties_keep_creation_order() {
        let today = date(2024, 6, 1);
        let expiry = Some(date(2025, 1, 1));
        let stock = stock_with_batches(&[("FIRST", 5, expiry), ("SECOND", 5, expiry)]);

        let order: Vec<&str> = stock
            .available_batches(today)
            .map(|b| b.batch_number())
            .collect();
        assert_eq!(order, vec!["FIRST", "SECOND"]);
    }

    #[test]
    fn test_fefo_skips_expired_and_empty_batches() {
        let today = date(2025, 6, 1);
        let mut stock = stock_with_batches(&[
            ("EXPIRED", 5, Some(date(2025, 1, 1))),
            ("EMPTY", 0, None),
            ("GOOD", 5, Some(date(2026, 1, 1))),
        ]);

        // fully reserve one more to prove reservations hide quantity too
        stock
            .add_batch("HELD", 3, Some(date(2026, 2, 1)), BatchCondition::Good, None)
            .unwrap();
        let held_id = stock.batches().last().unwrap().id().to_string();
        stock.reserve(&held_id, 3).unwrap();

        let order: Vec<&str> = stock
            .available_batches(today)
            .map(|b| b.batch_number())
            .collect();
        assert_eq!(order, vec!["GOOD"]);
    }

    #[test]
    fn test_batch_sellable_on_its_expiry_date() {
        let expiry = date(2025, 1, 1);
        let stock = stock_with_batches(&[("EDGE", 5, Some(expiry))]);

        assert_eq!(stock.available_batches(expiry).count(), 1);
        let day_after = date(2025, 1, 2);
        assert_eq!(stock.available_batches(day_after).count(), 0);
    }

    #[test]
    fn test_fefo_deduction_spans_batches_in_order() {
        let today = date(2024, 6, 1);
        let mut stock = stock_with_batches(&[
            ("B1", 5, Some(date(2025, 1, 1))),
            ("B2", 5, Some(date(2025, 3, 1))),
            ("B3", 5, None),
        ]);

        let plan = stock.deduct_fefo(7, today).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].batch_number.as_str(), plan[0].quantity), ("B1", 5));
        assert_eq!((plan[1].batch_number.as_str(), plan[1].quantity), ("B2", 2));

        assert_eq!(stock.batches()[0].quantity(), 0);
        assert_eq!(stock.batches()[1].quantity(), 3);
        assert_eq!(stock.batches()[2].quantity(), 5); // B3 untouched
    }

    #[test]
    fn test_fefo_shortfall_deducts_nothing() {
        let today = date(2023, 6, 1);
        let mut stock = stock_with_batches(&[("NO-EXP", 5, None), ("DATED", 3, Some(date(2024, 1, 1)))]);

        let err = stock.deduct_fefo(10, today).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
            } => {
                assert_eq!(available, 8);
                assert_eq!(requested, 10);
            }
            other => panic!("unexpected error: {other}"),
        }

        // no partial deduction committed
        assert_eq!(stock.batches()[0].quantity(), 5);
        assert_eq!(stock.batches()[1].quantity(), 3);
    }

    #[test]
    fn test_remove_quantity_bounds() {
        let mut stock = stock_with_batches(&[("A", 10, None)]);
        let batch_id = stock.batches()[0].id().to_string();

        stock.reserve(&batch_id, 4).unwrap();
        // only 6 available although 10 physical
        let err = stock.remove_quantity(&batch_id, 7).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 6, .. }));

        stock.remove_quantity(&batch_id, 6).unwrap();
        assert_eq!(stock.batches()[0].quantity(), 4);
        assert_eq!(stock.batches()[0].available_quantity(), 0);
    }

    #[test]
    fn test_reserve_and_release_bounds() {
        let mut stock = stock_with_batches(&[("A", 10, None)]);
        let batch_id = stock.batches()[0].id().to_string();

        assert!(stock.reserve(&batch_id, 11).is_err());
        stock.reserve(&batch_id, 10).unwrap();

        let err = stock.release_reservation(&batch_id, 11).unwrap_err();
        assert!(matches!(err, CoreError::ReleaseExceedsReservation { .. }));

        stock.release_reservation(&batch_id, 10).unwrap();
        assert_eq!(stock.total_reserved_quantity(), 0);

        // invariants: never negative, reserved never exceeds quantity
        assert!(stock.batches().iter().all(|b| b.quantity() >= 0
            && b.reserved_quantity() >= 0
            && b.reserved_quantity() <= b.quantity()));
    }

    #[test]
    fn test_remove_batch_refuses_reserved() {
        let mut stock = stock_with_batches(&[("A", 10, None)]);
        let batch_id = stock.batches()[0].id().to_string();

        stock.reserve(&batch_id, 1).unwrap();
        assert!(matches!(
            stock.remove_batch(&batch_id).unwrap_err(),
            CoreError::BatchReserved { .. }
        ));

        stock.release_reservation(&batch_id, 1).unwrap();
        stock.remove_batch(&batch_id).unwrap();
        assert!(stock.batches().is_empty());
    }

    #[test]
    fn test_derived_queries() {
        let today = date(2025, 6, 1);
        let mut stock = stock_with_batches(&[
            ("OLD", 2, Some(date(2025, 1, 1))),
            ("SOON", 3, Some(date(2025, 6, 10))),
            ("FRESH", 20, Some(date(2026, 6, 1))),
        ]);

        assert!(!stock.is_out_of_stock());
        assert!(stock.is_low_stock(25));
        assert!(!stock.is_low_stock(10));
        assert!(stock.has_expired_batches(today));
        assert!(stock.has_near_expiry_batches(today, 30));
        assert!(!stock.has_near_expiry_batches(today, 5));

        // drain everything sellable plus the expired leftovers
        let ids: Vec<String> = stock.batches().iter().map(|b| b.id().to_string()).collect();
        for id in &ids {
            let qty = stock.batches().iter().find(|b| b.id() == id).unwrap().quantity();
            if qty > 0 {
                stock.remove_quantity(id, qty).unwrap();
            }
        }
        assert!(stock.is_out_of_stock());
    }

    #[test]
    fn test_add_quantity_restocks_an_existing_batch() {
        let mut stock = stock_with_batches(&[("A", 10, None)]);
        let batch_id = stock.batches()[0].id().to_string();

        stock.add_quantity(&batch_id, 15).unwrap();
        assert_eq!(stock.total_quantity(), 25);

        assert!(stock.add_quantity(&batch_id, 0).is_err());
        assert!(stock.add_quantity("missing", 5).is_err());
    }

    #[test]
    fn test_zero_quantity_batch_can_be_registered() {
        let mut stock = Stock::create("pkg-1", "org-1", "loc-1");
        stock
            .add_batch("EMPTY", 0, None, BatchCondition::Good, None)
            .unwrap();
        assert_eq!(stock.total_quantity(), 0);
        assert!(stock.is_out_of_stock());
    }
}
