//! # Stock Repository
//!
//! Database operations for stock aggregates and their batches.
//!
//! The aggregate is always loaded and saved WHOLE: a stock row plus all of
//! its batch rows in creation order. Batch creation order matters - FEFO
//! breaks expiry ties with it - so batches carry an explicit `position`.
//!
//! Stock is the most contended aggregate in the system (concurrent sale
//! completions race on the same product/location), so every save is
//! version-checked and surfaces `DbError::Conflict` on a lost race.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use mizan_core::{BatchCondition, Stock, StockBatch};

use crate::error::{DbError, DbResult};
use crate::repository::{corrupt, parse_decimal};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct StockRow {
    id: String,
    product_packaging_id: String,
    organization_id: String,
    inventory_location_id: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: String,
    stock_id: String,
    batch_number: String,
    quantity: i64,
    reserved_quantity: i64,
    expiry_date: Option<NaiveDate>,
    condition: BatchCondition,
    cost_price: Option<String>,
    created_at: DateTime<Utc>,
}

const SELECT_STOCK: &str = r#"
    SELECT id, product_packaging_id, organization_id, inventory_location_id,
           version, created_at, updated_at
    FROM stocks
"#;

const SELECT_BATCHES: &str = r#"
    SELECT id, stock_id, batch_number, quantity, reserved_quantity,
           expiry_date, condition, cost_price, created_at
    FROM stock_batches
    WHERE stock_id = ?1
    ORDER BY position
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock database operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Inserts a freshly created stock aggregate.
    ///
    /// ## Errors
    /// `UniqueViolation` when a stock for the same
    /// (packaging, organization, location) triple already exists.
    pub async fn insert(&self, stock: &Stock) -> DbResult<()> {
        debug!(
            id = %stock.id(),
            packaging = %stock.product_packaging_id(),
            location = %stock.inventory_location_id(),
            "Inserting stock"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stocks (
                id, product_packaging_id, organization_id, inventory_location_id,
                version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(stock.id())
        .bind(stock.product_packaging_id())
        .bind(stock.organization_id())
        .bind(stock.inventory_location_id())
        .bind(stock.version())
        .bind(stock.created_at())
        .bind(stock.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DbError::UniqueViolation {
                    entity: "Stock".to_string(),
                    message: format!(
                        "stock for packaging {} at location {} already exists",
                        stock.product_packaging_id(),
                        stock.inventory_location_id()
                    ),
                }
            }
            other => other.into(),
        })?;

        insert_batches(&mut tx, stock).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets a stock aggregate (with batches) by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Stock>> {
        let row: Option<StockRow> = sqlx::query_as(&format!("{SELECT_STOCK} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Finds the stock aggregate for a packaging at a location.
    pub async fn find(
        &self,
        product_packaging_id: &str,
        organization_id: &str,
        inventory_location_id: &str,
    ) -> DbResult<Option<Stock>> {
        let row: Option<StockRow> = sqlx::query_as(&format!(
            r#"{SELECT_STOCK}
            WHERE product_packaging_id = ?1
              AND organization_id = ?2
              AND inventory_location_id = ?3"#
        ))
        .bind(product_packaging_id)
        .bind(organization_id)
        .bind(inventory_location_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Saves a stock aggregate in its own transaction.
    pub async fn save(&self, stock: &Stock) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        self.save_in(&mut tx, stock).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Saves a stock aggregate inside a caller-owned transaction.
    ///
    /// Version-checked: a concurrent save since this aggregate was loaded
    /// turns into `DbError::Conflict` with nothing written, so the caller
    /// can reload, re-run its availability checks, and retry.
    pub async fn save_in(&self, tx: &mut Transaction<'_, Sqlite>, stock: &Stock) -> DbResult<()> {
        debug!(id = %stock.id(), "Saving stock");

        let result = sqlx::query(
            r#"
            UPDATE stocks SET
                updated_at = ?2,
                version = version + 1
            WHERE id = ?1 AND version = ?3
            "#,
        )
        .bind(stock.id())
        .bind(stock.updated_at())
        .bind(stock.version())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Stock", stock.id()));
        }

        sqlx::query("DELETE FROM stock_batches WHERE stock_id = ?1")
            .bind(stock.id())
            .execute(&mut **tx)
            .await?;
        insert_batches(tx, stock).await?;

        Ok(())
    }

    async fn hydrate(&self, row: StockRow) -> DbResult<Stock> {
        let batch_rows: Vec<BatchRow> = sqlx::query_as(SELECT_BATCHES)
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

        let mut batches = Vec::with_capacity(batch_rows.len());
        for batch in batch_rows {
            batches.push(batch_to_domain(batch)?);
        }

        Ok(Stock::from_stored(
            row.id,
            row.product_packaging_id,
            row.organization_id,
            row.inventory_location_id,
            batches,
            row.version,
            row.created_at,
            row.updated_at,
        ))
    }
}

// =============================================================================
// Row ↔ Domain Mapping
// =============================================================================

async fn insert_batches(tx: &mut Transaction<'_, Sqlite>, stock: &Stock) -> DbResult<()> {
    for (position, batch) in stock.batches().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO stock_batches (
                id, stock_id, batch_number, quantity, reserved_quantity,
                expiry_date, condition, cost_price, position, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(batch.id())
        .bind(batch.stock_id())
        .bind(batch.batch_number())
        .bind(batch.quantity())
        .bind(batch.reserved_quantity())
        .bind(batch.expiry_date())
        .bind(batch.condition())
        .bind(batch.cost_price().map(|c| c.to_string()))
        .bind(position as i64)
        .bind(batch.created_at())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn batch_to_domain(row: BatchRow) -> DbResult<StockBatch> {
    let cost_price = row
        .cost_price
        .as_deref()
        .map(|c| parse_decimal(c, "stock_batches.cost_price"))
        .transpose()?;

    StockBatch::from_stored(
        row.id,
        row.stock_id,
        row.batch_number,
        row.quantity,
        row.reserved_quantity,
        row.expiry_date,
        row.condition,
        cost_price,
        row.created_at,
    )
    .map_err(corrupt)
}
