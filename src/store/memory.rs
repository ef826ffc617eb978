use crate::core::{CurrencyRef, RateRecord, RateRepository, ReferenceRepository, Source};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

type RateKey = (i32, Source, NaiveDate);

/// In-memory reference and rates tables.
///
/// Rates are keyed by (currency, source, date), so upserts behave like the
/// Postgres `ON CONFLICT` statement.
#[derive(Default)]
pub struct MemoryStore {
    references: Vec<CurrencyRef>,
    rates: Mutex<BTreeMap<RateKey, RateRecord>>,
    failing_currencies: HashSet<i32>,
    unreachable: bool,
}

impl MemoryStore {
    pub fn new(references: Vec<CurrencyRef>) -> Self {
        Self {
            references,
            ..Default::default()
        }
    }

    /// Makes every write for `currency_id` fail.
    pub fn with_failing_writes(mut self, currency_id: i32) -> Self {
        self.failing_currencies.insert(currency_id);
        self
    }

    /// Makes the reference query fail, as if the database were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub async fn rates(&self) -> Vec<RateRecord> {
        self.rates.lock().await.values().cloned().collect()
    }

    pub async fn insert_rate(&self, record: RateRecord) {
        let key = (record.currency_id, record.source, record.rate_date);
        self.rates.lock().await.insert(key, record);
    }
}

#[async_trait]
impl ReferenceRepository for MemoryStore {
    async fn enabled_for(&self, source: Source) -> Result<Vec<CurrencyRef>> {
        if self.unreachable {
            return Err(anyhow!("reference table is unreachable"));
        }
        let mut refs: Vec<CurrencyRef> = self
            .references
            .iter()
            .filter(|r| r.is_enabled_for(source))
            .cloned()
            .collect();
        refs.sort_by_key(|r| r.currency_id);
        Ok(refs)
    }
}

#[async_trait]
impl RateRepository for MemoryStore {
    async fn upsert_rate(&self, record: &RateRecord) -> Result<()> {
        if self.failing_currencies.contains(&record.currency_id) {
            return Err(anyhow!(
                "write rejected for currency {}",
                record.currency_id
            ));
        }
        debug!(?record, "Memory UPSERT");
        self.insert_rate(record.clone()).await;
        Ok(())
    }

    async fn latest_rate_date(
        &self,
        currency_id: i32,
        source: Source,
    ) -> Result<Option<NaiveDate>> {
        let rates = self.rates.lock().await;
        Ok(rates
            .keys()
            .filter(|(id, s, _)| *id == currency_id && *s == source)
            .map(|(_, _, date)| *date)
            .max())
    }
}
