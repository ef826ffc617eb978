//! Storage ports for the reference table and the rates table.

use crate::core::currency::{CurrencyRef, Source};
use crate::core::rate::RateRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Reference entries whose download flag for `source` is set.
    async fn enabled_for(&self, source: Source) -> Result<Vec<CurrencyRef>>;
}

#[async_trait]
pub trait RateRepository: Send + Sync {
    /// Inserts the rate or overwrites the one stored for the same
    /// (currency, source, date).
    async fn upsert_rate(&self, record: &RateRecord) -> Result<()>;

    async fn latest_rate_date(&self, currency_id: i32, source: Source)
    -> Result<Option<NaiveDate>>;
}
