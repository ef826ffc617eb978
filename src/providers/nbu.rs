use crate::core::rate::NoRatePublished;
use crate::core::{Quote, RateProvider, Source};
use crate::providers::util::get_text;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

/// National Bank of Ukraine statistics API, matched by ISO numeric code.
pub struct NbuProvider {
    base_url: String,
    client: reqwest::Client,
}

impl NbuProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        NbuProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, date: NaiveDate) -> String {
        format!(
            "{}/NBUStatService/v1/statdirectory/exchange?date={}&json",
            self.base_url,
            date.format("%Y%m%d")
        )
    }
}

#[derive(Debug, Deserialize)]
struct NbuRate {
    r030: u32,
    #[serde(with = "rust_decimal::serde::float")]
    rate: Decimal,
    cc: Option<String>,
    exchangedate: String,
}

fn parse_num_code(key: &str) -> Result<u32> {
    key.trim()
        .parse()
        .with_context(|| format!("Invalid ISO numeric currency code: '{key}'"))
}

fn parse_response(text: &str, key: &str, date: NaiveDate) -> Result<Quote> {
    let num_code = parse_num_code(key)?;
    let rates: Vec<NbuRate> = serde_json::from_str(text).with_context(|| {
        format!("Failed to parse NBU response for {key}. Response: '{text}'")
    })?;

    let entry = rates
        .iter()
        .find(|r| r.r030 == num_code)
        .ok_or_else(|| NoRatePublished {
            source: Source::Nbu,
            key: key.to_string(),
            date,
        })?;

    let published = NaiveDate::parse_from_str(entry.exchangedate.trim(), "%d.%m.%Y")
        .with_context(|| format!("Invalid NBU exchange date: '{}'", entry.exchangedate))?;
    if published != date {
        return Err(anyhow!(
            "NBU returned the rate for {} on {} instead of {}",
            key,
            published,
            date
        ));
    }
    if entry.rate <= Decimal::ZERO {
        return Err(anyhow!(
            "NBU returned a non-positive rate for {}: {}",
            key,
            entry.rate
        ));
    }

    debug!(code = ?entry.cc, "Matched NBU entry");
    Ok(Quote {
        date,
        nominal: 1,
        value: entry.rate,
    })
}

#[async_trait]
impl RateProvider for NbuProvider {
    fn source(&self) -> Source {
        Source::Nbu
    }

    #[instrument(name = "NbuRateFetch", skip(self), fields(key = %key, date = %date))]
    async fn fetch_rate(&self, key: &str, date: NaiveDate) -> Result<Quote> {
        // reject bad codes before spending a request on them
        parse_num_code(key)?;

        let url = self.url(date);
        let text = get_text(&self.client, &url)
            .await
            .with_context(|| format!("Failed to download NBU rate for {key}"))?;

        let quote = parse_response(&text, key, date)?;
        debug!(value = %quote.value, "Parsed NBU rate");
        Ok(quote)
    }
}
