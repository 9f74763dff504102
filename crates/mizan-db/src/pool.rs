//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) ── or ── DbConfig::in_memory()                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.sales() / db.stocks() / db.packagings() / db.currencies()          │
//! │  db.commit_sale_completion(sale, stocks)  ← one transaction            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! WAL (Write-Ahead Logging) is enabled for file databases: readers don't
//! block writers and vice versa. In-memory databases use the memory journal
//! and a single connection, since every connection would otherwise see its
//! own empty database.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use mizan_core::{Sale, Stock};

use crate::error::DbResult;
use crate::migrations;
use crate::repository::currency::CurrencyRepository;
use crate::repository::packaging::PackagingRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/mizan/mizan.db").max_connections(5);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file; `None` means in-memory.
    pub database_path: Option<PathBuf>,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// How long to wait for a free connection.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Configuration for a file-backed database.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: Some(database_path.into()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Configuration for an in-memory database (tests, seed dry runs).
    ///
    /// Pinned to a single connection: each SQLite in-memory connection is
    /// its own database, so a larger pool would hand out empty databases.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: None,
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Overrides the maximum pool size.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// The database handle: owns the pool and the repositories.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    sales: SaleRepository,
    stocks: StockRepository,
    packagings: PackagingRepository,
    currencies: CurrencyRepository,
}

impl Database {
    /// Creates the connection pool and runs pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let options = match &config.database_path {
            Some(path) => {
                debug!(path = %path.display(), "Opening database file");
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .foreign_keys(true)
            }
            None => {
                debug!("Opening in-memory database");
                SqliteConnectOptions::new()
                    .in_memory(true)
                    .journal_mode(SqliteJournalMode::Memory)
                    .foreign_keys(true)
            }
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        info!("Database ready");

        Ok(Database {
            sales: SaleRepository::new(pool.clone()),
            stocks: StockRepository::new(pool.clone()),
            packagings: PackagingRepository::new(pool.clone()),
            currencies: CurrencyRepository::new(pool.clone()),
            pool,
        })
    }

    /// The underlying pool, for ad-hoc queries in tests and tooling.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Sale and sale-item operations.
    pub fn sales(&self) -> &SaleRepository {
        &self.sales
    }

    /// Stock and batch operations.
    pub fn stocks(&self) -> &StockRepository {
        &self.stocks
    }

    /// Product packaging lookups.
    pub fn packagings(&self) -> &PackagingRepository {
        &self.packagings
    }

    /// Organization currency configuration.
    pub fn currencies(&self) -> &CurrencyRepository {
        &self.currencies
    }

    /// Persists a completed sale and every stock aggregate its FEFO
    /// deduction touched, in ONE transaction.
    ///
    /// Either everything commits - the status change, the payment, and all
    /// batch deductions - or nothing does. A version conflict on any row
    /// rolls the whole operation back and surfaces as `DbError::Conflict`
    /// for the caller to retry against fresh state.
    pub async fn commit_sale_completion(&self, sale: &Sale, stocks: &[Stock]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        self.sales.save_in(&mut tx, sale).await?;
        for stock in stocks {
            self.stocks.save_in(&mut tx, stock).await?;
        }

        tx.commit().await?;

        info!(sale_id = %sale.id(), stocks = stocks.len(), "Sale completion committed");
        Ok(())
    }
}
