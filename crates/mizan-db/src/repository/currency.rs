//! # Currency Repository
//!
//! Organization base currency and exchange-rate configuration.
//!
//! `load_rate_set` is the currency lookup the checkout layer depends on: it
//! resolves the organization's base currency and every configured
//! rate-to-base into a [`RateSet`] in one go, so the aggregates never need
//! another round trip mid-mutation. Failures are loud by design:
//!
//! - unknown organization → `NotFound`
//! - organization without a base currency → `MissingBaseCurrency`
//! - a currency missing from the set fails later, at conversion time, as
//!   `UnknownCurrency` - never silently converting at 1.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use mizan_core::{CurrencyCode, RateSet};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};
use crate::repository::{corrupt, parse_decimal};

#[derive(Debug, FromRow)]
struct RateRow {
    currency: String,
    rate_to_base: String,
}

/// Repository for organization currency configuration.
#[derive(Debug, Clone)]
pub struct CurrencyRepository {
    pool: SqlitePool,
}

impl CurrencyRepository {
    /// Creates a new CurrencyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CurrencyRepository { pool }
    }

    /// Registers (or renames) an organization.
    ///
    /// `base_currency = None` models an organization that has not finished
    /// its currency setup; checkout against it fails loudly.
    pub async fn upsert_organization(
        &self,
        organization_id: &str,
        name: &str,
        base_currency: Option<&str>,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, base_currency, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                base_currency = excluded.base_currency,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(base_currency)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets the rate-to-base for one currency of an organization.
    pub async fn set_rate(
        &self,
        organization_id: &str,
        currency: &str,
        rate_to_base: Decimal,
    ) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO exchange_rates (organization_id, currency, rate_to_base, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(organization_id, currency) DO UPDATE SET
                rate_to_base = excluded.rate_to_base,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(organization_id)
        .bind(currency)
        .bind(rate_to_base.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the organization's base currency code.
    pub async fn base_currency(&self, organization_id: &str) -> DbResult<CurrencyCode> {
        let base: Option<Option<String>> =
            sqlx::query_scalar("SELECT base_currency FROM organizations WHERE id = ?1")
                .bind(organization_id)
                .fetch_optional(&self.pool)
                .await?;

        let base = base
            .ok_or_else(|| DbError::not_found("Organization", organization_id))?
            .ok_or_else(|| DbError::MissingBaseCurrency(organization_id.to_string()))?;

        CurrencyCode::new(&base).map_err(corrupt)
    }

    /// Loads the full rate set for an organization: its base currency plus
    /// every configured rate-to-base.
    pub async fn load_rate_set(&self, organization_id: &str) -> DbResult<RateSet> {
        let base = self.base_currency(organization_id).await?;

        let rows: Vec<RateRow> = sqlx::query_as(
            "SELECT currency, rate_to_base FROM exchange_rates WHERE organization_id = ?1",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(organization_id = %organization_id, base = %base, rates = rows.len(), "Loaded rate set");

        let mut rates = RateSet::new(base);
        for row in rows {
            let currency = CurrencyCode::new(&row.currency).map_err(corrupt)?;
            let rate = parse_decimal(&row.rate_to_base, "exchange_rates.rate_to_base")?;
            rates.insert(currency, rate).map_err(corrupt)?;
        }

        Ok(rates)
    }
}
