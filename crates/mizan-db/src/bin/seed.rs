//! # Seed Data Generator
//!
//! Populates a database with a demo organization, currency rates,
//! packagings and batch-tracked stock for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file
//! cargo run -p mizan-db --bin seed
//!
//! # Specify database path
//! cargo run -p mizan-db --bin seed -- --db ./data/mizan.db
//! ```
//!
//! ## Generated Data
//! - One organization with IQD as base currency, USD/EUR rates
//! - A handful of pharmacy packagings (some barcoded, some discounted)
//! - Stock at two locations with staggered batch expiries, so FEFO has
//!   something interesting to chew on

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use uuid::Uuid;

use mizan_core::{BatchCondition, Discount, Price, ProductPackaging, Stock};
use mizan_db::{Database, DbConfig, DbError};

const ORG_ID: &str = "00000000-0000-0000-0000-000000000001";
const LOCATIONS: &[&str] = &["loc-main-floor", "loc-back-store"];

/// (name, barcode, list price IQD, catalog discount %)
const PACKAGINGS: &[(&str, Option<&str>, i64, Option<i64>)] = &[
    ("Paracetamol 500mg (20 tabs)", Some("6251000000017"), 1000, None),
    ("Amoxicillin 250mg (20 caps)", Some("6251000000024"), 8000, Some(25)),
    ("Vitamin C 1000mg (30 tabs)", Some("6251000000031"), 6500, None),
    ("Ibuprofen 400mg (30 tabs)", None, 3000, Some(10)),
    ("Saline spray 30ml", Some("6251000000055"), 4500, None),
];

#[tokio::main]
async fn main() -> Result<(), DbError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "./mizan.db".to_string());
    tracing::info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    seed_organization(&db).await?;
    let packaging_ids = seed_packagings(&db).await?;
    seed_stock(&db, &packaging_ids).await?;

    tracing::info!("Seed complete");
    Ok(())
}

fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

async fn seed_organization(db: &Database) -> Result<(), DbError> {
    db.currencies()
        .upsert_organization(ORG_ID, "Al-Shifa Pharmacy", Some("IQD"))
        .await?;
    db.currencies()
        .set_rate(ORG_ID, "USD", Decimal::from(1310))
        .await?;
    db.currencies()
        .set_rate(ORG_ID, "EUR", Decimal::from(1420))
        .await?;

    tracing::info!(organization = ORG_ID, "Organization seeded (base IQD)");
    Ok(())
}

async fn seed_packagings(db: &Database) -> Result<Vec<String>, DbError> {
    let now = Utc::now();
    let mut ids = Vec::new();

    for (name, barcode, price, discount_pct) in PACKAGINGS {
        let catalog_discount = match discount_pct {
            Some(pct) => Discount::percentage(Decimal::from(*pct))
                .map_err(|e| DbError::Internal(e.to_string()))?,
            None => Discount::none(),
        };

        let packaging = ProductPackaging {
            id: Uuid::new_v4().to_string(),
            organization_id: ORG_ID.to_string(),
            product_name: name.to_string(),
            barcode: barcode.map(str::to_string),
            list_price: Price::new(Decimal::from(*price), "IQD")
                .map_err(|e| DbError::Internal(e.to_string()))?,
            catalog_discount,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        db.packagings().insert(&packaging).await?;
        ids.push(packaging.id);
    }

    tracing::info!(count = ids.len(), "Packagings seeded");
    Ok(ids)
}

async fn seed_stock(db: &Database, packaging_ids: &[String]) -> Result<(), DbError> {
    let today = Utc::now().date_naive();
    let mut batches = 0usize;

    for (i, packaging_id) in packaging_ids.iter().enumerate() {
        for (l, location) in LOCATIONS.iter().enumerate() {
            let mut stock = Stock::create(packaging_id, ORG_ID, location);

            // staggered expiries: one near-expiry batch, one fresh batch,
            // and a no-expiry batch for every third packaging
            let near = today + Duration::days(20 + (i as i64) * 7);
            let fresh = today + Duration::days(365 + (i as i64) * 30);

            stock
                .add_batch(
                    &format!("LOT-{}{}-A", i, l),
                    10 + (i as i64) * 5,
                    Some(near),
                    BatchCondition::Good,
                    Some(Decimal::from(500 + (i as i64) * 100)),
                )
                .map_err(|e| DbError::Internal(e.to_string()))?;
            stock
                .add_batch(
                    &format!("LOT-{}{}-B", i, l),
                    50,
                    Some(fresh),
                    BatchCondition::Good,
                    None,
                )
                .map_err(|e| DbError::Internal(e.to_string()))?;
            if i % 3 == 0 {
                stock
                    .add_batch(
                        &format!("LOT-{}{}-C", i, l),
                        25,
                        None,
                        BatchCondition::Good,
                        None,
                    )
                    .map_err(|e| DbError::Internal(e.to_string()))?;
            }

            batches += stock.batches().len();
            db.stocks().insert(&stock).await?;
        }
    }

    tracing::info!(stocks = packaging_ids.len() * LOCATIONS.len(), batches, "Stock seeded");
    Ok(())
}
