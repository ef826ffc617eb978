//! PostgreSQL adapter for the reference and rates tables.

use crate::core::config::DatabaseConfig;
use crate::core::{CurrencyRef, RateRecord, RateRepository, ReferenceRepository, Source};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::debug;

const SELECT_CBR_ENABLED: &str = r#"SELECT currency_id, currency_code, currency_name, currency_identificator_cbr, currency_num_code, download_from_cbr, download_from_nbu
    FROM currency.t_ref_currency WHERE download_from_cbr IS TRUE ORDER BY currency_id"#;

const SELECT_NBU_ENABLED: &str = r#"SELECT currency_id, currency_code, currency_name, currency_identificator_cbr, currency_num_code, download_from_cbr, download_from_nbu
    FROM currency.t_ref_currency WHERE download_from_nbu IS TRUE ORDER BY currency_id"#;

const UPSERT_RATE: &str = r#"INSERT INTO currency.t_currency_rate (currency_id, source, rate_date, nominal, rate)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (currency_id, source, rate_date)
    DO UPDATE SET nominal = EXCLUDED.nominal, rate = EXCLUDED.rate, updated_at = now()"#;

const SELECT_LATEST_DATE: &str = r#"SELECT MAX(rate_date) FROM currency.t_currency_rate WHERE currency_id = $1 AND source = $2"#;

#[derive(Debug, sqlx::FromRow)]
struct DbCurrencyRef {
    currency_id: i32,
    currency_code: String,
    currency_name: Option<String>,
    currency_identificator_cbr: Option<String>,
    currency_num_code: Option<String>,
    download_from_cbr: bool,
    download_from_nbu: bool,
}

impl From<DbCurrencyRef> for CurrencyRef {
    fn from(row: DbCurrencyRef) -> Self {
        CurrencyRef {
            currency_id: row.currency_id,
            code: row.currency_code,
            name: row.currency_name,
            currency_identificator_cbr: row.currency_identificator_cbr,
            currency_num_code: row.currency_num_code,
            download_from_cbr: row.download_from_cbr,
            download_from_nbu: row.download_from_nbu,
        }
    }
}

/// Both repositories over a single-connection pool; writes are sequential.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and checks the connection, so an unreachable database
    /// fails the run before any fetch.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {} at {}:{}",
                    config.name, config.host, config.port
                )
            })?;
        debug!("Connected to database {}", config.name);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ReferenceRepository for PgStore {
    async fn enabled_for(&self, source: Source) -> Result<Vec<CurrencyRef>> {
        let sql = match source {
            Source::Cbr => SELECT_CBR_ENABLED,
            Source::Nbu => SELECT_NBU_ENABLED,
        };
        let rows: Vec<DbCurrencyRef> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load currencies enabled for {source}"))?;

        debug!("Loaded {} currencies enabled for {}", rows.len(), source);
        Ok(rows.into_iter().map(CurrencyRef::from).collect())
    }
}

#[async_trait]
impl RateRepository for PgStore {
    async fn upsert_rate(&self, record: &RateRecord) -> Result<()> {
        sqlx::query(UPSERT_RATE)
            .bind(record.currency_id)
            .bind(record.source.code())
            .bind(record.rate_date)
            .bind(record.nominal)
            .bind(record.value)
            .execute(&self.pool)
            .await
            .with_context(|| {
                format!(
                    "Failed to save {} rate for currency {} on {}",
                    record.source, record.currency_id, record.rate_date
                )
            })?;
        Ok(())
    }

    async fn latest_rate_date(
        &self,
        currency_id: i32,
        source: Source,
    ) -> Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> = sqlx::query_scalar(SELECT_LATEST_DATE)
            .bind(currency_id)
            .bind(source.code())
            .fetch_one(&self.pool)
            .await
            .with_context(|| {
                format!("Failed to read latest {source} rate date for currency {currency_id}")
            })?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    //! Run with `RATEKEEPER_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
    //! The tables from `sql/setup.sql` are created if missing.

    use super::*;
    use rust_decimal::Decimal;

    async fn setup_store() -> PgStore {
        let url = std::env::var("RATEKEEPER_TEST_DATABASE_URL")
            .expect("RATEKEEPER_TEST_DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();

        for statement in include_str!("../../sql/setup.sql").split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() && !stmt.lines().all(|l| l.trim_start().starts_with("--")) {
                sqlx::query(stmt).execute(&pool).await.unwrap();
            }
        }
        sqlx::query("DELETE FROM currency.t_currency_rate WHERE currency_id IN (9001, 9002)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"INSERT INTO currency.t_ref_currency
                (currency_id, currency_code, currency_name, currency_identificator_cbr, currency_num_code, download_from_cbr, download_from_nbu)
               VALUES (9001, 'XTA', 'Test A', 'R99001', '901', true, false),
                      (9002, 'XTB', 'Test B', NULL, '902', false, true)
               ON CONFLICT (currency_id) DO NOTHING"#,
        )
        .execute(&pool)
        .await
        .unwrap();

        PgStore::from_pool(pool)
    }

    #[tokio::test]
    #[ignore = "requires RATEKEEPER_TEST_DATABASE_URL"]
    async fn test_enabled_for_reads_flags() {
        let store = setup_store().await;

        let cbr = store.enabled_for(Source::Cbr).await.unwrap();
        assert!(cbr.iter().any(|r| r.currency_id == 9001));
        assert!(!cbr.iter().any(|r| r.currency_id == 9002));

        let nbu = store.enabled_for(Source::Nbu).await.unwrap();
        let b = nbu.iter().find(|r| r.currency_id == 9002).unwrap();
        assert_eq!(b.currency_num_code.as_deref(), Some("902"));
        assert!(b.currency_identificator_cbr.is_none());
    }

    #[tokio::test]
    #[ignore = "requires RATEKEEPER_TEST_DATABASE_URL"]
    async fn test_upsert_is_idempotent() {
        let store = setup_store().await;
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut record = RateRecord {
            currency_id: 9001,
            source: Source::Cbr,
            rate_date: date,
            nominal: 1,
            value: Decimal::new(916359, 4),
        };

        store.upsert_rate(&record).await.unwrap();
        store.upsert_rate(&record).await.unwrap();
        record.value = Decimal::new(920000, 4);
        store.upsert_rate(&record).await.unwrap();

        let (count, rate): (i64, Decimal) = sqlx::query_as(
            "SELECT COUNT(*), MAX(rate) FROM currency.t_currency_rate WHERE currency_id = 9001 AND source = 'CBR' AND rate_date = $1",
        )
        .bind(date)
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
        assert_eq!(rate, Decimal::new(920000, 4));

        assert_eq!(
            store.latest_rate_date(9001, Source::Cbr).await.unwrap(),
            Some(date)
        );
        assert_eq!(store.latest_rate_date(9001, Source::Nbu).await.unwrap(), None);
    }
}
