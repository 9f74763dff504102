//! # Checkout Service
//!
//! The use-case layer of the transaction engine. One method call = one
//! request = one atomic unit of work, executed to completion.
//!
//! ## Completion Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 complete_sale(ctx, sale_id, payment)                    │
//! │                                                                         │
//! │  ┌────────────────────────── retry ≤ N ──────────────────────────────┐ │
//! │  │                                                                    │ │
//! │  │  1. Load the sale fresh (version v)                               │ │
//! │  │  2. Record the payment on the aggregate                           │ │
//! │  │  3. Per line: load its Stock, run FEFO deduction in memory        │ │
//! │  │     └── shortfall? → InsufficientStock, abort, nothing written    │ │
//! │  │  4. sale.complete()  (state machine check)                        │ │
//! │  │  5. ONE transaction: save sale + every touched stock,             │ │
//! │  │     each write guarded by `WHERE version = v`                     │ │
//! │  │     ├── commit → done                                             │ │
//! │  │     └── version conflict → rollback, loop (fresh load re-checks   │ │
//! │  │         availability, so two racing tills cannot oversell)        │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  Domain errors (underpaid, empty sale, overpayment, ...) are never     │
//! │  retried - they surface to the caller unchanged.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Currency rates are resolved BEFORE any aggregate method runs and passed
//! in as plain values, so the aggregates stay free of I/O.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mizan_core::{
    BatchCondition, BatchDraw, CoreError, Discount, DiscountKind, Price, ProductPackaging,
    RateSet, Sale, Stock,
};
use mizan_db::{Database, DbError};

use crate::error::{CheckoutError, CheckoutResult};
use crate::rates::RateCache;

// =============================================================================
// Configuration & Context
// =============================================================================

/// Tuning knobs for the checkout service.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// How long a resolved rate set stays cached per organization.
    pub rate_cache_ttl: Duration,

    /// How many times an operation retries a version conflict before
    /// giving up with [`CheckoutError::Contention`].
    pub max_commit_attempts: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            rate_cache_ttl: Duration::from_secs(60),
            max_commit_attempts: 3,
        }
    }
}

/// Who is calling: supplied per call by the authentication layer above
/// this crate, never global state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub organization_id: String,
    pub sales_person_id: String,
}

impl CallerContext {
    pub fn new(organization_id: impl Into<String>, sales_person_id: impl Into<String>) -> Self {
        CallerContext {
            organization_id: organization_id.into(),
            sales_person_id: sales_person_id.into(),
        }
    }
}

// =============================================================================
// Request / Response Shapes
// =============================================================================

/// A line discount as requested by the till.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRequest {
    pub kind: DiscountKind,
    pub value: Decimal,
}

/// A batch being received into stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub condition: BatchCondition,
    pub cost_price: Option<Decimal>,
}

/// What one sale line drew from which batches at completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDeduction {
    pub product_packaging_id: String,
    pub product_name: String,
    pub draws: Vec<BatchDraw>,
}

/// The result of a successful completion: the finalized sale plus the
/// batch-level deduction record (for the receipt / audit trail).
#[derive(Debug, Clone)]
pub struct CompletedSale {
    pub sale: Sale,
    pub deductions: Vec<LineDeduction>,
}

// =============================================================================
// Checkout Service
// =============================================================================

/// The transaction orchestrator.
///
/// Holds the database handle and the rate cache; cheap to clone per
/// request handler.
pub struct CheckoutService {
    db: Database,
    rates: RateCache,
    config: CheckoutConfig,
}

impl CheckoutService {
    /// Creates a service with default configuration.
    pub fn new(db: Database) -> Self {
        Self::with_config(db, CheckoutConfig::default())
    }

    /// Creates a service with explicit configuration.
    pub fn with_config(db: Database, config: CheckoutConfig) -> Self {
        CheckoutService {
            rates: RateCache::new(config.rate_cache_ttl),
            db,
            config,
        }
    }

    // -------------------------------------------------------------------------
    // Cart Use Cases
    // -------------------------------------------------------------------------

    /// Returns the caller's open cart at a location, creating an empty
    /// draft if none exists.
    pub async fn open_sale(&self, ctx: &CallerContext, location_id: &str) -> CheckoutResult<Sale> {
        debug!(location = %location_id, user = %ctx.sales_person_id, "open_sale");

        if let Some(sale) = self
            .db
            .sales()
            .find_open(&ctx.organization_id, &ctx.sales_person_id, location_id)
            .await?
        {
            return Ok(sale);
        }

        let rates = self.resolve_rates(&ctx.organization_id).await?;
        let sale = Sale::open(
            generate_sale_number(location_id),
            &ctx.organization_id,
            location_id,
            &ctx.sales_person_id,
            rates.base().clone(),
        );
        self.db.sales().insert(&sale).await?;

        info!(sale_id = %sale.id(), sale_number = %sale.sale_number(), "Draft sale opened");
        Ok(sale)
    }

    /// Adds a line to the cart, resolving the packaging by id or barcode
    /// and freezing its current selling price onto the line.
    ///
    /// The whole line quantity (existing + added) is checked against the
    /// location's available stock before the cart changes.
    pub async fn add_line(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        id_or_barcode: &str,
        quantity: i64,
    ) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, input = %id_or_barcode, quantity = %quantity, "add_line");

        let packaging = self.resolve_active_packaging(ctx, id_or_barcode).await?;
        let rates = self.resolve_rates(&ctx.organization_id).await?;

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;

            let already_in_cart = sale
                .items()
                .iter()
                .find(|i| i.product_packaging_id() == packaging.id)
                .map(|i| i.quantity())
                .unwrap_or(0);
            self.ensure_available(
                ctx,
                &packaging,
                sale.inventory_location_id(),
                already_in_cart + quantity,
            )
            .await?;

            sale.add_item(
                &packaging.id,
                &packaging.product_name,
                quantity,
                packaging.selling_price(),
                Discount::none(),
                &rates,
            )?;

            match self.db.sales().save(&sale).await {
                Ok(()) => {
                    info!(sale_id = %sale_id, packaging = %packaging.id, quantity, "Line added");
                    return Ok(sale);
                }
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    /// Sets a new quantity on a cart line, re-checking availability when
    /// the quantity grows.
    pub async fn update_line_quantity(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, item_id = %item_id, quantity = %quantity, "update_line_quantity");

        let rates = self.resolve_rates(&ctx.organization_id).await?;

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;

            let item = sale
                .items()
                .iter()
                .find(|i| i.id() == item_id)
                .ok_or_else(|| CheckoutError::NotFound {
                    entity: "sale item",
                    id: item_id.to_string(),
                })?;

            if quantity > item.quantity() {
                let packaging_id = item.product_packaging_id().to_string();
                let product_name = item.product_name().to_string();
                let available = self
                    .available_at(ctx, &packaging_id, sale.inventory_location_id())
                    .await?;
                if available < quantity {
                    return Err(CheckoutError::InsufficientStock {
                        product_name,
                        available,
                        requested: quantity,
                    });
                }
            }

            sale.update_item_quantity(item_id, quantity, &rates)?;

            match self.db.sales().save(&sale).await {
                Ok(()) => return Ok(sale),
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    /// Removes a cart line.
    pub async fn remove_line(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        item_id: &str,
    ) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, item_id = %item_id, "remove_line");

        let rates = self.resolve_rates(&ctx.organization_id).await?;

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;
            sale.remove_item(item_id, &rates)?;

            match self.db.sales().save(&sale).await {
                Ok(()) => return Ok(sale),
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    /// Applies (or clears, with `DiscountKind::None`) a line discount.
    /// Bounds are validated before the aggregate is touched.
    pub async fn apply_line_discount(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        item_id: &str,
        request: DiscountRequest,
    ) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, item_id = %item_id, kind = ?request.kind, "apply_line_discount");

        let discount = Discount::from_stored(request.kind, request.value)?;
        let rates = self.resolve_rates(&ctx.organization_id).await?;

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;
            sale.update_item_discount(item_id, discount.clone(), &rates)?;

            match self.db.sales().save(&sale).await {
                Ok(()) => return Ok(sale),
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Payment & Lifecycle Use Cases
    // -------------------------------------------------------------------------

    /// Records a (partial) payment towards the sale.
    pub async fn record_payment(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        amount: Price,
    ) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, amount = %amount, "record_payment");

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;
            sale.record_payment(&amount)?;

            match self.db.sales().save(&sale).await {
                Ok(()) => {
                    info!(sale_id = %sale_id, paid = %sale.amount_paid(), "Payment recorded");
                    return Ok(sale);
                }
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    /// Completes the sale: records the final payment (if any), deducts
    /// every line FEFO-wise from the sale's location, and persists the
    /// sale plus all touched stock aggregates in one transaction.
    ///
    /// Any failure - underpayment, a stock shortfall on any line, a lost
    /// version race past the retry budget - aborts the whole operation
    /// with nothing written.
    pub async fn complete_sale(
        &self,
        ctx: &CallerContext,
        sale_id: &str,
        payment: Option<Price>,
    ) -> CheckoutResult<CompletedSale> {
        debug!(sale_id = %sale_id, "complete_sale");

        let today = Utc::now().date_naive();

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;

            if let Some(amount) = &payment {
                sale.record_payment(amount)?;
            }

            // Deduct every line in memory first; only a fully planned
            // deduction ever reaches the database.
            let mut stocks: Vec<Stock> = Vec::with_capacity(sale.items().len());
            let mut deductions: Vec<LineDeduction> = Vec::with_capacity(sale.items().len());
            for item in sale.items() {
                let mut stock = self
                    .db
                    .stocks()
                    .find(
                        item.product_packaging_id(),
                        &ctx.organization_id,
                        sale.inventory_location_id(),
                    )
                    .await?
                    .ok_or_else(|| CheckoutError::InsufficientStock {
                        product_name: item.product_name().to_string(),
                        available: 0,
                        requested: item.quantity(),
                    })?;

                let draws = stock.deduct_fefo(item.quantity(), today).map_err(|err| {
                    match err {
                        CoreError::InsufficientStock {
                            available,
                            requested,
                        } => CheckoutError::InsufficientStock {
                            product_name: item.product_name().to_string(),
                            available,
                            requested,
                        },
                        other => other.into(),
                    }
                })?;

                deductions.push(LineDeduction {
                    product_packaging_id: item.product_packaging_id().to_string(),
                    product_name: item.product_name().to_string(),
                    draws,
                });
                stocks.push(stock);
            }

            sale.complete()?;

            match self.db.commit_sale_completion(&sale, &stocks).await {
                Ok(()) => {
                    info!(
                        sale_id = %sale_id,
                        sale_number = %sale.sale_number(),
                        grand_total = %sale.grand_total(),
                        lines = deductions.len(),
                        "Sale completed"
                    );
                    return Ok(CompletedSale { sale, deductions });
                }
                Err(e) => self.retry_or_bail(e, "Sale completion", sale_id, &mut attempt)?,
            }
        }
    }

    /// Cancels an unpaid sale.
    pub async fn cancel_sale(&self, ctx: &CallerContext, sale_id: &str) -> CheckoutResult<Sale> {
        debug!(sale_id = %sale_id, "cancel_sale");

        let mut attempt = 1;
        loop {
            let mut sale = self.load_owned_sale(ctx, sale_id).await?;
            sale.cancel()?;

            match self.db.sales().save(&sale).await {
                Ok(()) => {
                    info!(sale_id = %sale_id, "Sale cancelled");
                    return Ok(sale);
                }
                Err(e) => self.retry_or_bail(e, "Sale", sale_id, &mut attempt)?,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Inventory Use Cases
    // -------------------------------------------------------------------------

    /// Receives a batch into stock at a location, creating the stock
    /// aggregate on first receipt.
    ///
    /// Two tills receiving the first batch of the same packaging race on
    /// the (packaging, organization, location) uniqueness; the loser
    /// retries and lands on the winner's aggregate.
    pub async fn receive_stock(
        &self,
        ctx: &CallerContext,
        location_id: &str,
        id_or_barcode: &str,
        batch: NewBatch,
    ) -> CheckoutResult<Stock> {
        debug!(location = %location_id, input = %id_or_barcode, batch = %batch.batch_number, "receive_stock");

        let packaging = self.resolve_active_packaging(ctx, id_or_barcode).await?;

        let mut attempt = 1;
        loop {
            let existing = self
                .db
                .stocks()
                .find(&packaging.id, &ctx.organization_id, location_id)
                .await?;

            let result = match existing {
                Some(mut stock) => {
                    stock.add_batch(
                        &batch.batch_number,
                        batch.quantity,
                        batch.expiry_date,
                        batch.condition,
                        batch.cost_price,
                    )?;
                    self.db.stocks().save(&stock).await.map(|()| stock)
                }
                None => {
                    let mut stock =
                        Stock::create(&packaging.id, &ctx.organization_id, location_id);
                    stock.add_batch(
                        &batch.batch_number,
                        batch.quantity,
                        batch.expiry_date,
                        batch.condition,
                        batch.cost_price,
                    )?;
                    self.db.stocks().insert(&stock).await.map(|()| stock)
                }
            };

            match result {
                Ok(stock) => {
                    info!(
                        stock_id = %stock.id(),
                        batch = %batch.batch_number,
                        quantity = batch.quantity,
                        "Batch received"
                    );
                    return Ok(stock);
                }
                Err(e)
                    if matches!(e, DbError::UniqueViolation { .. })
                        && attempt < self.config.max_commit_attempts =>
                {
                    warn!(attempt, "Lost stock creation race, retrying against winner");
                    attempt += 1;
                }
                Err(e) => self.retry_or_bail(e, "Stock", &packaging.id, &mut attempt)?,
            }
        }
    }

    /// Places a reservation hold on a batch, identified by its batch
    /// number within the location's stock.
    pub async fn reserve_stock(
        &self,
        ctx: &CallerContext,
        location_id: &str,
        id_or_barcode: &str,
        batch_number: &str,
        quantity: i64,
    ) -> CheckoutResult<Stock> {
        debug!(location = %location_id, batch = %batch_number, quantity, "reserve_stock");

        self.mutate_batch(ctx, location_id, id_or_barcode, batch_number, |stock, batch_id| {
            stock.reserve(batch_id, quantity)
        })
        .await
    }

    /// Releases a previously placed reservation hold.
    pub async fn release_stock(
        &self,
        ctx: &CallerContext,
        location_id: &str,
        id_or_barcode: &str,
        batch_number: &str,
        quantity: i64,
    ) -> CheckoutResult<Stock> {
        debug!(location = %location_id, batch = %batch_number, quantity, "release_stock");

        self.mutate_batch(ctx, location_id, id_or_barcode, batch_number, |stock, batch_id| {
            stock.release_reservation(batch_id, quantity)
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Shared load-mutate-save loop for single-batch operations.
    async fn mutate_batch<F>(
        &self,
        ctx: &CallerContext,
        location_id: &str,
        id_or_barcode: &str,
        batch_number: &str,
        mutate: F,
    ) -> CheckoutResult<Stock>
    where
        F: Fn(&mut Stock, &str) -> Result<(), CoreError>,
    {
        let packaging = self.resolve_active_packaging(ctx, id_or_barcode).await?;

        let mut attempt = 1;
        loop {
            let mut stock = self
                .db
                .stocks()
                .find(&packaging.id, &ctx.organization_id, location_id)
                .await?
                .ok_or_else(|| CheckoutError::NotFound {
                    entity: "stock",
                    id: format!("{}@{}", packaging.id, location_id),
                })?;

            let batch_id = stock
                .batches()
                .iter()
                .find(|b| b.batch_number() == batch_number)
                .map(|b| b.id().to_string())
                .ok_or_else(|| CheckoutError::NotFound {
                    entity: "stock batch",
                    id: batch_number.to_string(),
                })?;

            mutate(&mut stock, &batch_id)?;

            match self.db.stocks().save(&stock).await {
                Ok(()) => return Ok(stock),
                Err(e) => self.retry_or_bail(e, "Stock", stock.id(), &mut attempt)?,
            }
        }
    }

    /// Loads the sale and verifies it belongs to the caller's organization.
    /// A sale from another organization is indistinguishable from a missing
    /// one on purpose.
    async fn load_owned_sale(&self, ctx: &CallerContext, sale_id: &str) -> CheckoutResult<Sale> {
        let sale = self
            .db
            .sales()
            .find_by_id(sale_id)
            .await?
            .filter(|s| s.organization_id() == ctx.organization_id)
            .ok_or_else(|| CheckoutError::NotFound {
                entity: "sale",
                id: sale_id.to_string(),
            })?;

        Ok(sale)
    }

    /// Resolves a sellable packaging by id or barcode.
    async fn resolve_active_packaging(
        &self,
        ctx: &CallerContext,
        id_or_barcode: &str,
    ) -> CheckoutResult<ProductPackaging> {
        let packaging = self
            .db
            .packagings()
            .resolve(&ctx.organization_id, id_or_barcode)
            .await?
            .ok_or_else(|| CheckoutError::NotFound {
                entity: "product packaging",
                id: id_or_barcode.to_string(),
            })?;

        if !packaging.is_active {
            return Err(CheckoutError::InactivePackaging { id: packaging.id });
        }

        Ok(packaging)
    }

    /// The location's total available quantity for a packaging; a missing
    /// stock aggregate counts as zero.
    async fn available_at(
        &self,
        ctx: &CallerContext,
        packaging_id: &str,
        location_id: &str,
    ) -> CheckoutResult<i64> {
        Ok(self
            .db
            .stocks()
            .find(packaging_id, &ctx.organization_id, location_id)
            .await?
            .map(|s| s.total_available_quantity())
            .unwrap_or(0))
    }

    async fn ensure_available(
        &self,
        ctx: &CallerContext,
        packaging: &ProductPackaging,
        location_id: &str,
        requested: i64,
    ) -> CheckoutResult<()> {
        let available = self.available_at(ctx, &packaging.id, location_id).await?;

        if available < requested {
            return Err(CheckoutError::InsufficientStock {
                product_name: packaging.product_name.clone(),
                available,
                requested,
            });
        }

        Ok(())
    }

    /// Resolves the organization's rate set, serving from the TTL cache
    /// when fresh. A miss is resolved synchronously - totals are never
    /// computed against stale-and-unchecked rates.
    async fn resolve_rates(&self, organization_id: &str) -> CheckoutResult<RateSet> {
        if let Some(rates) = self.rates.get(organization_id) {
            return Ok(rates);
        }

        let rates = self.db.currencies().load_rate_set(organization_id).await?;
        self.rates.put(organization_id, rates.clone());
        Ok(rates)
    }

    /// On a version conflict with budget left: bumps the attempt counter
    /// and returns Ok so the caller's loop reloads and retries. Everything
    /// else becomes a terminal error.
    fn retry_or_bail(
        &self,
        err: DbError,
        entity: &'static str,
        id: &str,
        attempt: &mut u32,
    ) -> CheckoutResult<()> {
        if err.is_conflict() {
            if *attempt < self.config.max_commit_attempts {
                warn!(entity, id, attempt = *attempt, "Version conflict, retrying");
                *attempt += 1;
                return Ok(());
            }
            return Err(CheckoutError::Contention {
                entity,
                id: id.to_string(),
                attempts: *attempt,
            });
        }

        Err(err.into())
    }
}

// =============================================================================
// Sale Number Generation
// =============================================================================

/// Generates a sale number: `YYYYMMDD-LL-XXXXXX`.
///
/// ## Format
/// - `YYYYMMDD`: business date
/// - `LL`: last two characters of the location id
/// - `XXXXXX`: random hex, so concurrent tills never collide
fn generate_sale_number(location_id: &str) -> String {
    let date_part = Utc::now().format("%Y%m%d");

    let location_code: String = location_id
        .chars()
        .rev()
        .take(2)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    let location_code = if location_code.len() < 2 {
        "00".to_string()
    } else {
        location_code
    };

    let entropy = Uuid::new_v4().simple().to_string();

    format!("{}-{}-{}", date_part, location_code, &entropy[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_number_format() {
        let number = generate_sale_number("loc-main-floor");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1], "or"); // last two chars of "loc-main-floor"
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_sale_numbers_do_not_collide() {
        let a = generate_sale_number("loc-1");
        let b = generate_sale_number("loc-1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_location_pads_code() {
        let number = generate_sale_number("x");
        assert!(number.contains("-00-"));
    }
}
