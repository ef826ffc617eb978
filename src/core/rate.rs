//! Rate abstractions and core types

use crate::core::currency::Source;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A rate as published by a bank: `value` units of the bank's home
/// currency buy `nominal` units of the foreign currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub date: NaiveDate,
    pub nominal: i32,
    pub value: Decimal,
}

/// The row written to the rates table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRecord {
    pub currency_id: i32,
    pub source: Source,
    pub rate_date: NaiveDate,
    pub nominal: i32,
    pub value: Decimal,
}

impl RateRecord {
    pub fn from_quote(currency_id: i32, source: Source, quote: &Quote) -> Self {
        Self {
            currency_id,
            source,
            rate_date: quote.date,
            nominal: quote.nominal,
            value: quote.value,
        }
    }
}

/// The bank answered, but has no rate for the identifier on that date
/// (weekends, holidays, retired currencies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoRatePublished {
    pub source: Source,
    pub key: String,
    pub date: NaiveDate,
}

impl std::fmt::Display for NoRatePublished {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} published no rate for {} on {}",
            self.source, self.key, self.date
        )
    }
}

impl std::error::Error for NoRatePublished {}

#[async_trait]
pub trait RateProvider: Send + Sync {
    fn source(&self) -> Source;

    /// Fetches the rate for one bank-specific identifier on `date`.
    async fn fetch_rate(&self, key: &str, date: NaiveDate) -> Result<Quote>;
}
