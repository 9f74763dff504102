//! Integration tests for the repositories against in-memory SQLite.
//!
//! Every test gets its own database with migrations applied; the seed data
//! each test writes goes through the same repositories the checkout layer
//! uses.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use mizan_core::{
    BatchCondition, CurrencyCode, Discount, Price, ProductPackaging, RateSet, Sale, SaleStatus,
    Stock,
};
use mizan_db::{Database, DbConfig, DbError};

const ORG: &str = "org-test";
const LOCATION: &str = "loc-1";
const CASHIER: &str = "user-1";

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

async fn seed_org(db: &Database) {
    db.currencies()
        .upsert_organization(ORG, "Test Org", Some("IQD"))
        .await
        .unwrap();
    db.currencies()
        .set_rate(ORG, "USD", Decimal::from(1310))
        .await
        .unwrap();
}

async fn seed_packaging(db: &Database, name: &str, barcode: Option<&str>, price: i64) -> String {
    let now = Utc::now();
    let packaging = ProductPackaging {
        id: Uuid::new_v4().to_string(),
        organization_id: ORG.to_string(),
        product_name: name.to_string(),
        barcode: barcode.map(str::to_string),
        list_price: Price::new(Decimal::from(price), "IQD").unwrap(),
        catalog_discount: Discount::none(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.packagings().insert(&packaging).await.unwrap();
    packaging.id
}

fn rates() -> RateSet {
    RateSet::new(CurrencyCode::new("IQD").unwrap())
        .with_rate(CurrencyCode::new("USD").unwrap(), Decimal::from(1310))
        .unwrap()
}

fn open_sale() -> Sale {
    Sale::open(
        format!("S-{}", Uuid::new_v4()),
        ORG,
        LOCATION,
        CASHIER,
        CurrencyCode::new("IQD").unwrap(),
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// Sales
// =============================================================================

#[tokio::test]
async fn sale_roundtrips_with_items_in_order() {
    let db = test_db().await;
    seed_org(&db).await;

    let r = rates();
    let mut sale = open_sale();
    sale.add_item("pkg-a", "Paracetamol 500mg", 3, Price::new(Decimal::from(1000), "IQD").unwrap(), Discount::none(), &r)
        .unwrap();
    sale.add_item(
        "pkg-b",
        "Vitamin C 1000mg",
        2,
        Price::new(Decimal::from(3), "USD").unwrap(),
        Discount::percentage(Decimal::from(10)).unwrap(),
        &r,
    )
    .unwrap();
    db.sales().insert(&sale).await.unwrap();

    let loaded = db.sales().find_by_id(sale.id()).await.unwrap().unwrap();
    assert_eq!(loaded.sale_number(), sale.sale_number());
    assert_eq!(loaded.status(), SaleStatus::Draft);
    assert_eq!(loaded.items().len(), 2);
    // insertion order survives the roundtrip
    assert_eq!(loaded.items()[0].product_packaging_id(), "pkg-a");
    assert_eq!(loaded.items()[1].product_packaging_id(), "pkg-b");
    assert_eq!(loaded.grand_total().amount(), sale.grand_total().amount());
    // line totals are derived on load, not stored
    assert_eq!(
        loaded.items()[1].line_total().amount(),
        Decimal::from(6) - Decimal::new(6, 1) // 6 USD less 10%
    );
}

#[tokio::test]
async fn sale_save_bumps_version_and_detects_conflicts() {
    let db = test_db().await;
    seed_org(&db).await;

    let r = rates();
    let mut sale = open_sale();
    db.sales().insert(&sale).await.unwrap();

    sale.add_item("pkg-a", "Paracetamol 500mg", 1, Price::new(Decimal::from(500), "IQD").unwrap(), Discount::none(), &r)
        .unwrap();
    db.sales().save(&sale).await.unwrap();

    let reloaded = db.sales().find_by_id(sale.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.version(), sale.version() + 1);

    // saving the stale in-memory copy again loses the version race
    let err = db.sales().save(&sale).await.unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {err}");
}

#[tokio::test]
async fn find_open_returns_the_cashiers_draft() {
    let db = test_db().await;
    seed_org(&db).await;

    assert!(db
        .sales()
        .find_open(ORG, CASHIER, LOCATION)
        .await
        .unwrap()
        .is_none());

    let sale = open_sale();
    db.sales().insert(&sale).await.unwrap();

    let found = db
        .sales()
        .find_open(ORG, CASHIER, LOCATION)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), sale.id());

    // a different location has no open cart
    assert!(db
        .sales()
        .find_open(ORG, CASHIER, "loc-other")
        .await
        .unwrap()
        .is_none());
}

// =============================================================================
// Stock
// =============================================================================

#[tokio::test]
async fn stock_roundtrips_with_batches_in_creation_order() {
    let db = test_db().await;
    seed_org(&db).await;
    let pkg = seed_packaging(&db, "Paracetamol 500mg", None, 1000).await;

    let mut stock = Stock::create(&pkg, ORG, LOCATION);
    stock
        .add_batch("LOT-B", 5, Some(date(2027, 3, 1)), BatchCondition::Good, None)
        .unwrap();
    stock
        .add_batch("LOT-A", 7, Some(date(2027, 1, 1)), BatchCondition::Good, Some(Decimal::new(7505, 1)))
        .unwrap();
    stock
        .add_batch("LOT-C", 3, None, BatchCondition::Quarantined, None)
        .unwrap();
    db.stocks().insert(&stock).await.unwrap();

    let loaded = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();
    assert_eq!(loaded.batches().len(), 3);
    // creation order, not expiry order, is what's stored
    let numbers: Vec<&str> = loaded.batches().iter().map(|b| b.batch_number()).collect();
    assert_eq!(numbers, vec!["LOT-B", "LOT-A", "LOT-C"]);
    assert_eq!(loaded.batches()[1].cost_price(), Some(Decimal::new(7505, 1)));
    assert_eq!(loaded.batches()[2].condition(), BatchCondition::Quarantined);
    assert_eq!(loaded.total_quantity(), 15);

    // FEFO order is derived after load
    let order: Vec<&str> = loaded
        .available_batches(date(2026, 6, 1))
        .map(|b| b.batch_number())
        .collect();
    assert_eq!(order, vec!["LOT-A", "LOT-B", "LOT-C"]);
}

#[tokio::test]
async fn duplicate_stock_for_same_triple_is_rejected() {
    let db = test_db().await;
    seed_org(&db).await;
    let pkg = seed_packaging(&db, "Paracetamol 500mg", None, 1000).await;

    db.stocks()
        .insert(&Stock::create(&pkg, ORG, LOCATION))
        .await
        .unwrap();

    let err = db
        .stocks()
        .insert(&Stock::create(&pkg, ORG, LOCATION))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));
}

#[tokio::test]
async fn stale_stock_save_conflicts() {
    let db = test_db().await;
    seed_org(&db).await;
    let pkg = seed_packaging(&db, "Paracetamol 500mg", None, 1000).await;

    let mut stock = Stock::create(&pkg, ORG, LOCATION);
    stock
        .add_batch("LOT-1", 10, None, BatchCondition::Good, None)
        .unwrap();
    db.stocks().insert(&stock).await.unwrap();

    // two loads of the same aggregate, as two racing completions would do
    let mut first = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();
    let mut second = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();

    let today = date(2026, 6, 1);
    first.deduct_fefo(6, today).unwrap();
    db.stocks().save(&first).await.unwrap();

    // the second copy's availability check passed before the first commit;
    // the version check keeps it from overselling
    second.deduct_fefo(6, today).unwrap();
    let err = db.stocks().save(&second).await.unwrap_err();
    assert!(err.is_conflict());

    let fresh = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();
    assert_eq!(fresh.total_quantity(), 4);
}

#[tokio::test]
async fn sale_and_stock_commit_in_one_transaction() {
    let db = test_db().await;
    seed_org(&db).await;
    let pkg = seed_packaging(&db, "Paracetamol 500mg", None, 1000).await;

    let mut stock = Stock::create(&pkg, ORG, LOCATION);
    stock
        .add_batch("LOT-1", 10, None, BatchCondition::Good, None)
        .unwrap();
    db.stocks().insert(&stock).await.unwrap();
    let mut stock = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();

    let r = rates();
    let mut sale = open_sale();
    sale.add_item(&pkg, "Paracetamol 500mg", 4, Price::new(Decimal::from(1000), "IQD").unwrap(), Discount::none(), &r)
        .unwrap();
    db.sales().insert(&sale).await.unwrap();
    let mut sale = db.sales().find_by_id(sale.id()).await.unwrap().unwrap();

    sale.record_payment(&Price::new(Decimal::from(4000), "IQD").unwrap())
        .unwrap();
    stock.deduct_fefo(4, date(2026, 6, 1)).unwrap();
    sale.complete().unwrap();

    db.commit_sale_completion(&sale, std::slice::from_ref(&stock))
        .await
        .unwrap();

    let sale = db.sales().find_by_id(sale.id()).await.unwrap().unwrap();
    let stock = db.stocks().find(&pkg, ORG, LOCATION).await.unwrap().unwrap();
    assert_eq!(sale.status(), SaleStatus::Completed);
    assert_eq!(stock.total_quantity(), 6);
}

// =============================================================================
// Packagings & Currencies
// =============================================================================

#[tokio::test]
async fn packaging_resolves_by_id_then_barcode() {
    let db = test_db().await;
    seed_org(&db).await;
    let pkg = seed_packaging(&db, "Saline spray 30ml", Some("6251000000055"), 4500).await;

    let by_id = db.packagings().resolve(ORG, &pkg).await.unwrap().unwrap();
    assert_eq!(by_id.product_name, "Saline spray 30ml");

    let by_barcode = db
        .packagings()
        .resolve(ORG, "6251000000055")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_barcode.id, pkg);

    assert!(db.packagings().resolve(ORG, "no-such").await.unwrap().is_none());
}

#[tokio::test]
async fn rate_set_loads_base_and_rates() {
    let db = test_db().await;
    seed_org(&db).await;

    let rates = db.currencies().load_rate_set(ORG).await.unwrap();
    assert_eq!(rates.base().as_str(), "IQD");
    assert_eq!(
        rates
            .to_base(Decimal::from(2), &CurrencyCode::new("USD").unwrap())
            .unwrap(),
        Decimal::from(2620)
    );
}

#[tokio::test]
async fn missing_base_currency_fails_loudly() {
    let db = test_db().await;
    db.currencies()
        .upsert_organization("org-unconfigured", "Half-Setup Org", None)
        .await
        .unwrap();

    let err = db
        .currencies()
        .load_rate_set("org-unconfigured")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::MissingBaseCurrency(_)));

    let err = db.currencies().load_rate_set("org-ghost").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}
