//! # Sale Aggregate
//!
//! The cart/receipt aggregate: owns its line items, recomputes
//! multi-currency totals, and enforces the payment and completion rules.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sale State Machine                                 │
//! │                                                                         │
//! │                 add/update/remove items                                │
//! │                      ┌───────┐                                          │
//! │                      ▼       │                                          │
//! │                  ┌───────────┴─┐   record_payment    ┌───────────────┐ │
//! │   open() ──────► │    Draft    │ ──(0 < paid < tot)─►│ PartiallyPaid │ │
//! │                  └──────┬──────┘                     └───────┬───────┘ │
//! │                         │  cancel()                          │         │
//! │                         │  (paid == 0)      complete()       │         │
//! │                         ▼                   (paid == total)  │         │
//! │                  ┌─────────────┐                             │         │
//! │                  │  Cancelled  │            ┌───────────┐    │         │
//! │                  └─────────────┘            │ Completed │◄───┤         │
//! │                         ▲                   └───────────┘    │         │
//! │                         └────────────── cancel() (paid == 0)─┘         │
//! │                                                                         │
//! │  Completed is ONLY reached via an explicit complete() call — a         │
//! │  payment covering the full total never flips the status by itself.     │
//! │  Completed and Cancelled are terminal.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! Line items may be priced in any currency; `total_discount` and
//! `grand_total` are always in the organization's base currency, recomputed
//! from the items through a caller-supplied [`RateSet`] after every item
//! mutation. They are never assigned directly. `complete()` does not touch
//! stock — stock deduction is the checkout orchestrator's job, inside the
//! same transaction as completion.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::RateSet;
use crate::discount::Discount;
use crate::error::{CoreError, ValidationError};
use crate::price::{CurrencyCode, Price};
use crate::validation::{validate_product_name, validate_quantity};
use crate::MAX_SALE_ITEMS;

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is being assembled (the cart); items are mutable.
    #[default]
    Draft,
    /// Some payment recorded, less than the grand total.
    PartiallyPaid,
    /// Fully paid and explicitly completed. Terminal.
    Completed,
    /// Abandoned before payment. Terminal.
    Cancelled,
}

impl SaleStatus {
    /// True for states in which no further mutation is allowed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Cancelled)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item on a sale.
///
/// Uses the snapshot pattern: `product_name` and `unit_price` are frozen at
/// the moment the line is added, so the receipt stays stable even if the
/// catalog changes afterwards. The line total is always derived from
/// `unit_price × quantity` and the discount — it is never stored as
/// independent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    id: String,
    sale_id: String,
    product_packaging_id: String,
    product_name: String,
    quantity: i64,
    unit_price: Price,
    discount: Discount,
}

impl SaleItem {
    fn new(
        sale_id: &str,
        product_packaging_id: &str,
        product_name: &str,
        quantity: i64,
        unit_price: Price,
        discount: Discount,
    ) -> Result<Self, CoreError> {
        validate_quantity(quantity)?;
        validate_product_name(product_name)?;

        Ok(SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_packaging_id: product_packaging_id.to_string(),
            product_name: product_name.to_string(),
            quantity,
            unit_price,
            discount,
        })
    }

    /// Rebuilds a line from storage, re-running the invariant checks.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: String,
        sale_id: String,
        product_packaging_id: String,
        product_name: String,
        quantity: i64,
        unit_price: Price,
        discount: Discount,
    ) -> Result<Self, CoreError> {
        validate_quantity(quantity)?;

        Ok(SaleItem {
            id,
            sale_id,
            product_packaging_id,
            product_name,
            quantity,
            unit_price,
            discount,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn sale_id(&self) -> &str {
        &self.sale_id
    }

    #[inline]
    pub fn product_packaging_id(&self) -> &str {
        &self.product_packaging_id
    }

    #[inline]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn unit_price(&self) -> &Price {
        &self.unit_price
    }

    #[inline]
    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    /// The pre-discount line amount: `unit_price × quantity`.
    pub fn gross_amount(&self) -> Price {
        self.unit_price.multiply(self.quantity)
    }

    /// The discount taken off this line, in the line's own currency.
    pub fn discount_amount(&self) -> Price {
        self.discount.amount_off(&self.gross_amount())
    }

    /// The line total after discount. Always derived, never cached.
    pub fn line_total(&self) -> Price {
        self.discount.apply_to(&self.gross_amount())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The sale aggregate root.
///
/// Construction goes through [`Sale::open`] (new draft) or
/// [`Sale::from_stored`] (rehydration); all mutation goes through methods so
/// the invariants hold after every operation:
///
/// - `amount_paid <= grand_total`, always
/// - totals are in the organization's base currency, recomputed from items
/// - at most one line per distinct product packaging
/// - items only mutable while Draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    id: String,
    sale_number: String,
    sale_date: DateTime<Utc>,
    organization_id: String,
    inventory_location_id: String,
    sales_person_id: String,
    status: SaleStatus,
    items: Vec<SaleItem>,
    total_discount: Price,
    grand_total: Price,
    amount_paid: Price,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Opens a new empty draft sale with zeroed totals in the base currency.
    pub fn open(
        sale_number: String,
        organization_id: &str,
        inventory_location_id: &str,
        sales_person_id: &str,
        base_currency: CurrencyCode,
    ) -> Self {
        let now = Utc::now();

        Sale {
            id: Uuid::new_v4().to_string(),
            sale_number,
            sale_date: now,
            organization_id: organization_id.to_string(),
            inventory_location_id: inventory_location_id.to_string(),
            sales_person_id: sales_person_id.to_string(),
            status: SaleStatus::Draft,
            items: Vec::new(),
            total_discount: Price::zero(base_currency.clone()),
            grand_total: Price::zero(base_currency.clone()),
            amount_paid: Price::zero(base_currency),
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Rebuilds a sale from storage.
    ///
    /// Totals are taken as stored; the next item mutation recomputes them.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: String,
        sale_number: String,
        sale_date: DateTime<Utc>,
        organization_id: String,
        inventory_location_id: String,
        sales_person_id: String,
        status: SaleStatus,
        items: Vec<SaleItem>,
        total_discount: Price,
        grand_total: Price,
        amount_paid: Price,
        notes: Option<String>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, CoreError> {
        if amount_paid.amount() > grand_total.amount() {
            return Err(CoreError::Overpayment {
                sale_id: id,
                attempted: Decimal::ZERO,
                amount_paid: amount_paid.amount(),
                grand_total: grand_total.amount(),
            });
        }

        Ok(Sale {
            id,
            sale_number,
            sale_date,
            organization_id,
            inventory_location_id,
            sales_person_id,
            status,
            items,
            total_discount,
            grand_total,
            amount_paid,
            notes,
            version,
            created_at,
            updated_at,
            completed_at,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn sale_number(&self) -> &str {
        &self.sale_number
    }

    #[inline]
    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    #[inline]
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    #[inline]
    pub fn inventory_location_id(&self) -> &str {
        &self.inventory_location_id
    }

    #[inline]
    pub fn sales_person_id(&self) -> &str {
        &self.sales_person_id
    }

    #[inline]
    pub fn status(&self) -> SaleStatus {
        self.status
    }

    /// The line items, in insertion order.
    #[inline]
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    #[inline]
    pub fn total_discount(&self) -> &Price {
        &self.total_discount
    }

    #[inline]
    pub fn grand_total(&self) -> &Price {
        &self.grand_total
    }

    #[inline]
    pub fn amount_paid(&self) -> &Price {
        &self.amount_paid
    }

    #[inline]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
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

    #[inline]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The outstanding balance in the base currency.
    pub fn outstanding(&self) -> Decimal {
        self.grand_total.amount() - self.amount_paid.amount()
    }

    // -------------------------------------------------------------------------
    // Cart Mutations (Draft only)
    // -------------------------------------------------------------------------

    /// Adds a line, or merges into the existing line for the same packaging.
    ///
    /// ## Behavior
    /// - Same `product_packaging_id` already on the sale: its quantity grows
    ///   by `quantity`; the existing price snapshot and discount stay. The
    ///   line-count cap is not checked on this path.
    /// - New packaging: rejected once the sale already has
    ///   [`MAX_SALE_ITEMS`] lines.
    ///
    /// Returns the id of the affected line. Totals are recomputed against
    /// `rates`.
    pub fn add_item(
        &mut self,
        product_packaging_id: &str,
        product_name: &str,
        quantity: i64,
        unit_price: Price,
        discount: Discount,
        rates: &RateSet,
    ) -> Result<String, CoreError> {
        self.ensure_draft("add item")?;
        validate_quantity(quantity)?;

        let item_id = if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_packaging_id == product_packaging_id)
        {
            existing.quantity += quantity;
            existing.id.clone()
        } else {
            if self.items.len() >= MAX_SALE_ITEMS {
                return Err(CoreError::SaleTooLarge {
                    max: MAX_SALE_ITEMS,
                });
            }

            let item = SaleItem::new(
                &self.id,
                product_packaging_id,
                product_name,
                quantity,
                unit_price,
                discount,
            )?;
            let id = item.id.clone();
            self.items.push(item);
            id
        };

        self.recalculate_totals(rates)?;
        Ok(item_id)
    }

    /// Sets a new quantity on an existing line.
    pub fn update_item_quantity(
        &mut self,
        item_id: &str,
        quantity: i64,
        rates: &RateSet,
    ) -> Result<(), CoreError> {
        self.ensure_draft("update item")?;
        validate_quantity(quantity)?;

        let item = self.item_mut(item_id)?;
        item.quantity = quantity;

        self.recalculate_totals(rates)
    }

    /// Removes a line from the sale.
    pub fn remove_item(&mut self, item_id: &str, rates: &RateSet) -> Result<(), CoreError> {
        self.ensure_draft("remove item")?;

        let position = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "sale item",
                id: item_id.to_string(),
            })?;
        self.items.remove(position);

        self.recalculate_totals(rates)
    }

    /// Replaces the discount on an existing line.
    pub fn update_item_discount(
        &mut self,
        item_id: &str,
        discount: Discount,
        rates: &RateSet,
    ) -> Result<(), CoreError> {
        self.ensure_draft("apply discount")?;

        let item = self.item_mut(item_id)?;
        item.discount = discount;

        self.recalculate_totals(rates)
    }

    /// Replaces the free-text notes.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.updated_at = Utc::now();
    }

    // -------------------------------------------------------------------------
    // Payments & Lifecycle
    // -------------------------------------------------------------------------

    /// Records a payment towards the sale.
    ///
    /// ## Rules
    /// - Only while Draft or PartiallyPaid
    /// - Amount must be positive and in the totals' (base) currency
    /// - Paying past the grand total is an `Overpayment` error
    /// - While `0 < paid < total` the status is PartiallyPaid; reaching the
    ///   full total never auto-completes the sale
    pub fn record_payment(&mut self, amount: &Price) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.invalid_status("record payment"));
        }

        if amount.amount() <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }

        if amount.currency() != self.amount_paid.currency() {
            return Err(CoreError::CurrencyMismatch {
                expected: self.amount_paid.currency().to_string(),
                actual: amount.currency().to_string(),
            });
        }

        let new_paid = self.amount_paid.amount() + amount.amount();
        if new_paid > self.grand_total.amount() {
            return Err(CoreError::Overpayment {
                sale_id: self.id.clone(),
                attempted: amount.amount(),
                amount_paid: self.amount_paid.amount(),
                grand_total: self.grand_total.amount(),
            });
        }

        self.amount_paid = Price::raw(new_paid, self.amount_paid.currency().clone());

        if new_paid < self.grand_total.amount() {
            self.status = SaleStatus::PartiallyPaid;
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Completes the sale.
    ///
    /// ## Rules
    /// - Only from Draft or PartiallyPaid
    /// - At least one item, a positive grand total, and full payment
    ///
    /// This method does NOT deduct stock. The checkout orchestrator runs the
    /// FEFO deduction in the same transaction as this state change.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.invalid_status("complete"));
        }

        if self.items.is_empty() {
            return Err(CoreError::EmptySale {
                sale_id: self.id.clone(),
            });
        }

        if self.grand_total.amount() <= Decimal::ZERO {
            return Err(CoreError::ZeroTotal {
                sale_id: self.id.clone(),
            });
        }

        if self.amount_paid.amount() < self.grand_total.amount() {
            return Err(CoreError::Underpaid {
                sale_id: self.id.clone(),
                amount_paid: self.amount_paid.amount(),
                grand_total: self.grand_total.amount(),
            });
        }

        self.status = SaleStatus::Completed;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels the sale.
    ///
    /// ## Rules
    /// - Completed (and already Cancelled) sales cannot be cancelled
    /// - A sale with recorded payments must be refunded first
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.invalid_status("cancel"));
        }

        if self.amount_paid.amount() > Decimal::ZERO {
            return Err(CoreError::CancelWithPayments {
                sale_id: self.id.clone(),
            });
        }

        self.status = SaleStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Recomputes `total_discount` and `grand_total` in the base currency.
    ///
    /// ## Algorithm
    /// 1. No items: both totals reset to zero in the base currency.
    /// 2. Per item: the (already discounted) line total converts to base and
    ///    accumulates into the grand total; the item's discount amount
    ///    converts independently and accumulates into the total discount.
    /// 3. `amount_paid <= grand_total` is re-enforced by clamping the paid
    ///    amount down. This is a deliberate auto-correction (a quantity
    ///    reduction after a payment), not an error.
    ///
    /// Calling this twice without an item mutation yields identical totals.
    pub fn recalculate_totals(&mut self, rates: &RateSet) -> Result<(), CoreError> {
        let base = rates.base().clone();

        let mut total_in_base = Decimal::ZERO;
        let mut discount_in_base = Decimal::ZERO;

        for item in &self.items {
            total_in_base += rates.to_base(item.line_total().amount(), item.unit_price.currency())?;
            discount_in_base +=
                rates.to_base(item.discount_amount().amount(), item.unit_price.currency())?;
        }

        self.total_discount = Price::raw(discount_in_base, base.clone());
        self.grand_total = Price::raw(total_in_base, base.clone());

        if self.amount_paid.amount() > self.grand_total.amount() {
            self.amount_paid = self.grand_total.clone();
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn ensure_draft(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.status != SaleStatus::Draft {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: self.id.clone(),
                status: self.status,
                operation,
            });
        }
        Ok(())
    }

    fn invalid_status(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidSaleStatus {
            sale_id: self.id.clone(),
            status: self.status,
            operation,
        }
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut SaleItem, CoreError> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "sale item",
                id: item_id.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
