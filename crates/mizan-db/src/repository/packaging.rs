//! # Packaging Repository
//!
//! Catalog lookups for product packagings.
//!
//! The transaction engine consumes the catalog read-only: a cashier scans a
//! barcode or picks from a list, and the engine resolves that to a
//! packaging whose `selling_price()` becomes the frozen line price. Catalog
//! CRUD lives in another subsystem; `insert` exists here for seeding and
//! tests only.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use mizan_core::{Discount, DiscountKind, Price, ProductPackaging};

use crate::error::DbResult;
use crate::repository::{corrupt, parse_decimal};

// =============================================================================
// Row Type
// =============================================================================

#[derive(Debug, FromRow)]
struct PackagingRow {
    id: String,
    organization_id: String,
    product_name: String,
    barcode: Option<String>,
    list_price_amount: String,
    list_price_currency: String,
    catalog_discount_kind: DiscountKind,
    catalog_discount_value: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_PACKAGING: &str = r#"
    SELECT id, organization_id, product_name, barcode, list_price_amount,
           list_price_currency, catalog_discount_kind, catalog_discount_value,
           is_active, created_at, updated_at
    FROM product_packagings
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for product packaging lookups.
#[derive(Debug, Clone)]
pub struct PackagingRepository {
    pool: SqlitePool,
}

impl PackagingRepository {
    /// Creates a new PackagingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PackagingRepository { pool }
    }

    /// Gets a packaging by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ProductPackaging>> {
        let row: Option<PackagingRow> =
            sqlx::query_as(&format!("{SELECT_PACKAGING} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(to_domain).transpose()
    }

    /// Gets a packaging by barcode within an organization.
    pub async fn get_by_barcode(
        &self,
        organization_id: &str,
        barcode: &str,
    ) -> DbResult<Option<ProductPackaging>> {
        let row: Option<PackagingRow> = sqlx::query_as(&format!(
            "{SELECT_PACKAGING} WHERE organization_id = ?1 AND barcode = ?2"
        ))
        .bind(organization_id)
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_domain).transpose()
    }

    /// Resolves a cashier's input: tries the packaging ID first, then the
    /// barcode. Returns `None` when neither matches.
    pub async fn resolve(
        &self,
        organization_id: &str,
        id_or_barcode: &str,
    ) -> DbResult<Option<ProductPackaging>> {
        debug!(input = %id_or_barcode, "Resolving packaging");

        if let Some(packaging) = self.get_by_id(id_or_barcode).await? {
            if packaging.organization_id == organization_id {
                return Ok(Some(packaging));
            }
        }

        self.get_by_barcode(organization_id, id_or_barcode).await
    }

    /// Inserts a packaging. Seeding and tests only - catalog CRUD is not
    /// this subsystem's job.
    pub async fn insert(&self, packaging: &ProductPackaging) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_packagings (
                id, organization_id, product_name, barcode, list_price_amount,
                list_price_currency, catalog_discount_kind, catalog_discount_value,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&packaging.id)
        .bind(&packaging.organization_id)
        .bind(&packaging.product_name)
        .bind(&packaging.barcode)
        .bind(packaging.list_price.amount().to_string())
        .bind(packaging.list_price.currency().as_str())
        .bind(packaging.catalog_discount.kind())
        .bind(packaging.catalog_discount.value().to_string())
        .bind(packaging.is_active)
        .bind(packaging.created_at)
        .bind(packaging.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Row → Domain Mapping
// =============================================================================

fn to_domain(row: PackagingRow) -> DbResult<ProductPackaging> {
    let list_price = Price::new(
        parse_decimal(&row.list_price_amount, "product_packagings.list_price_amount")?,
        &row.list_price_currency,
    )
    .map_err(corrupt)?;

    let catalog_discount = Discount::from_stored(
        row.catalog_discount_kind,
        parse_decimal(
            &row.catalog_discount_value,
            "product_packagings.catalog_discount_value",
        )?,
    )
    .map_err(corrupt)?;

    Ok(ProductPackaging {
        id: row.id,
        organization_id: row.organization_id,
        product_name: row.product_name,
        barcode: row.barcode,
        list_price,
        catalog_discount,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
