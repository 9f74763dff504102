//! # Sale Repository
//!
//! Database operations for sales and their line items.
//!
//! ## Persistence Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Persistence                                  │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert(sale) → sales row + (no items yet)                     │
//! │                                                                         │
//! │  2. CART MUTATIONS                                                     │
//! │     └── save(sale) → UPDATE sales ... WHERE id AND version             │
//! │                      DELETE + reinsert sale_items (ordered)            │
//! │                                                                         │
//! │  3. COMPLETION                                                         │
//! │     └── save_in(tx, sale) → same write, inside the transaction that    │
//! │                             also writes the deducted stocks            │
//! │                                                                         │
//! │  The version check turns a lost-update race into DbError::Conflict;    │
//! │  mizan-checkout reloads and retries.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line totals are NOT stored: they are derived from quantity, unit price
//! and discount on the way out, exactly like the in-memory aggregate does.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use mizan_core::{CurrencyCode, Discount, DiscountKind, Price, Sale, SaleItem, SaleStatus};

use crate::error::{DbError, DbResult};
use crate::repository::{corrupt, parse_decimal};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    sale_number: String,
    sale_date: DateTime<Utc>,
    organization_id: String,
    inventory_location_id: String,
    sales_person_id: String,
    status: SaleStatus,
    total_discount: String,
    grand_total: String,
    amount_paid: String,
    currency: String,
    notes: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_packaging_id: String,
    product_name: String,
    quantity: i64,
    unit_price_amount: String,
    unit_price_currency: String,
    discount_kind: DiscountKind,
    discount_value: String,
}

const SELECT_SALE: &str = r#"
    SELECT id, sale_number, sale_date, organization_id, inventory_location_id,
           sales_person_id, status, total_discount, grand_total, amount_paid,
           currency, notes, version, created_at, updated_at, completed_at
    FROM sales
"#;

const SELECT_ITEMS: &str = r#"
    SELECT id, sale_id, product_packaging_id, product_name, quantity,
           unit_price_amount, unit_price_currency, discount_kind, discount_value
    FROM sale_items
    WHERE sale_id = ?1
    ORDER BY position
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a freshly opened sale with its (usually empty) items.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id(), sale_number = %sale.sale_number(), "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, sale_date, organization_id, inventory_location_id,
                sales_person_id, status, total_discount, grand_total, amount_paid,
                currency, notes, version, created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(sale.id())
        .bind(sale.sale_number())
        .bind(sale.sale_date())
        .bind(sale.organization_id())
        .bind(sale.inventory_location_id())
        .bind(sale.sales_person_id())
        .bind(sale.status())
        .bind(sale.total_discount().amount().to_string())
        .bind(sale.grand_total().amount().to_string())
        .bind(sale.amount_paid().amount().to_string())
        .bind(sale.grand_total().currency().as_str())
        .bind(sale.notes())
        .bind(sale.version())
        .bind(sale.created_at())
        .bind(sale.updated_at())
        .bind(sale.completed_at())
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, sale).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets a sale (with its items) by ID.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> =
            sqlx::query_as(&format!("{SELECT_SALE} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Finds the open cart - Draft or PartiallyPaid - for a cashier at a
    /// location. The oldest one wins if several exist.
    pub async fn find_open(
        &self,
        organization_id: &str,
        sales_person_id: &str,
        inventory_location_id: &str,
    ) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!(
            r#"{SELECT_SALE}
            WHERE organization_id = ?1
              AND sales_person_id = ?2
              AND inventory_location_id = ?3
              AND status IN ('draft', 'partially_paid')
            ORDER BY created_at
            LIMIT 1"#
        ))
        .bind(organization_id)
        .bind(sales_person_id)
        .bind(inventory_location_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Saves a sale in its own transaction.
    pub async fn save(&self, sale: &Sale) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        self.save_in(&mut tx, sale).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Saves a sale inside a caller-owned transaction.
    ///
    /// The write is version-checked: if the stored version moved since the
    /// aggregate was loaded, nothing is written and `DbError::Conflict` is
    /// returned so the caller can reload and retry.
    pub async fn save_in(&self, tx: &mut Transaction<'_, Sqlite>, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id(), status = ?sale.status(), "Saving sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = ?2,
                total_discount = ?3,
                grand_total = ?4,
                amount_paid = ?5,
                currency = ?6,
                notes = ?7,
                updated_at = ?8,
                completed_at = ?9,
                version = version + 1
            WHERE id = ?1 AND version = ?10
            "#,
        )
        .bind(sale.id())
        .bind(sale.status())
        .bind(sale.total_discount().amount().to_string())
        .bind(sale.grand_total().amount().to_string())
        .bind(sale.amount_paid().amount().to_string())
        .bind(sale.grand_total().currency().as_str())
        .bind(sale.notes())
        .bind(sale.updated_at())
        .bind(sale.completed_at())
        .bind(sale.version())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Sale", sale.id()));
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale.id())
            .execute(&mut **tx)
            .await?;
        insert_items(tx, sale).await?;

        Ok(())
    }

    async fn hydrate(&self, row: SaleRow) -> DbResult<Sale> {
        let item_rows: Vec<SaleItemRow> = sqlx::query_as(SELECT_ITEMS)
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item in item_rows {
            items.push(item_to_domain(item)?);
        }

        sale_to_domain(row, items)
    }
}

// =============================================================================
// Row ↔ Domain Mapping
// =============================================================================

async fn insert_items(tx: &mut Transaction<'_, Sqlite>, sale: &Sale) -> DbResult<()> {
    for (position, item) in sale.items().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_packaging_id, product_name, quantity,
                unit_price_amount, unit_price_currency, discount_kind,
                discount_value, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(item.id())
        .bind(item.sale_id())
        .bind(item.product_packaging_id())
        .bind(item.product_name())
        .bind(item.quantity())
        .bind(item.unit_price().amount().to_string())
        .bind(item.unit_price().currency().as_str())
        .bind(item.discount().kind())
        .bind(item.discount().value().to_string())
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn item_to_domain(row: SaleItemRow) -> DbResult<SaleItem> {
    let unit_price = Price::new(
        parse_decimal(&row.unit_price_amount, "sale_items.unit_price_amount")?,
        &row.unit_price_currency,
    )
    .map_err(corrupt)?;

    let discount = Discount::from_stored(
        row.discount_kind,
        parse_decimal(&row.discount_value, "sale_items.discount_value")?,
    )
    .map_err(corrupt)?;

    SaleItem::from_stored(
        row.id,
        row.sale_id,
        row.product_packaging_id,
        row.product_name,
        row.quantity,
        unit_price,
        discount,
    )
    .map_err(corrupt)
}

fn sale_to_domain(row: SaleRow, items: Vec<SaleItem>) -> DbResult<Sale> {
    let currency = CurrencyCode::new(&row.currency).map_err(corrupt)?;

    let total_discount = Price::with_currency(
        parse_decimal(&row.total_discount, "sales.total_discount")?,
        currency.clone(),
    )
    .map_err(corrupt)?;
    let grand_total = Price::with_currency(
        parse_decimal(&row.grand_total, "sales.grand_total")?,
        currency.clone(),
    )
    .map_err(corrupt)?;
    let amount_paid = Price::with_currency(
        parse_decimal(&row.amount_paid, "sales.amount_paid")?,
        currency,
    )
    .map_err(corrupt)?;

    Sale::from_stored(
        row.id,
        row.sale_number,
        row.sale_date,
        row.organization_id,
        row.inventory_location_id,
        row.sales_person_id,
        row.status,
        items,
        total_discount,
        grand_total,
        amount_paid,
        row.notes,
        row.version,
        row.created_at,
        row.updated_at,
        row.completed_at,
    )
    .map_err(corrupt)
}
