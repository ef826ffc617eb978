use crate::core::rate::NoRatePublished;
use crate::core::{Quote, RateProvider, Source};
use crate::providers::util::{get_text, parse_decimal};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Central Bank of Russia, queried per currency through `XML_dynamic.asp`.
pub struct CbrProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CbrProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        CbrProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn url(&self, key: &str, date: NaiveDate) -> String {
        let day = date.format("%d/%m/%Y");
        format!(
            "{}/scripts/XML_dynamic.asp?date_req1={day}&date_req2={day}&VAL_NM_RQ={key}",
            self.base_url
        )
    }
}

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "Record", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "@Date")]
    date: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Value")]
    value: String,
}

fn parse_response(text: &str, key: &str, date: NaiveDate) -> Result<Quote> {
    let val_curs: ValCurs = quick_xml::de::from_str(text)
        .with_context(|| format!("Failed to parse CBR response for {key}"))?;

    let record = val_curs
        .records
        .iter()
        .find(|r| NaiveDate::parse_from_str(r.date.trim(), "%d.%m.%Y").ok() == Some(date))
        .ok_or_else(|| NoRatePublished {
            source: Source::Cbr,
            key: key.to_string(),
            date,
        })?;

    let nominal: i32 = record
        .nominal
        .trim()
        .parse()
        .with_context(|| format!("Invalid CBR nominal for {key}: '{}'", record.nominal))?;
    let value = parse_decimal(&record.value)
        .with_context(|| format!("Invalid CBR rate for {key}"))?;
    if nominal <= 0 || value <= Decimal::ZERO {
        return Err(anyhow!(
            "CBR returned a non-positive rate for {}: {}/{}",
            key,
            value,
            nominal
        ));
    }

    Ok(Quote {
        date,
        nominal,
        value,
    })
}

#[async_trait]
impl RateProvider for CbrProvider {
    fn source(&self) -> Source {
        Source::Cbr
    }

    #[instrument(name = "CbrRateFetch", skip(self), fields(key = %key, date = %date))]
    async fn fetch_rate(&self, key: &str, date: NaiveDate) -> Result<Quote> {
        let url = self.url(key, date);
        let text = get_text(&self.client, &url)
            .await
            .with_context(|| format!("Failed to download CBR rate for {key}"))?;

        let quote = parse_response(&text, key, date)?;
        debug!(value = %quote.value, nominal = quote.nominal, "Parsed CBR rate");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::util::build_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn cbr_body(key: &str, date: &str, nominal: u32, value: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs ID="{key}" DateRange1="{date}" DateRange2="{date}" name="Foreign Currency Market Dynamic">
<Record Date="{date}" Id="{key}"><Nominal>{nominal}</Nominal><Value>{value}</Value><VunitRate>{value}</VunitRate></Record>
</ValCurs>"#
        )
    }

    async fn create_cbr_mock_server(key: &str, body: &str, status_code: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scripts/XML_dynamic.asp"))
            .and(query_param("VAL_NM_RQ", key))
            .and(query_param("date_req1", "15/03/2024"))
            .and(query_param("date_req2", "15/03/2024"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> CbrProvider {
        CbrProvider::new(
            &server.uri(),
            build_client(Duration::from_secs(5)).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_successful_cbr_rate_fetch() {
        let body = cbr_body("R01235", "15.03.2024", 1, "91,6359");
        let server = create_cbr_mock_server("R01235", &body, 200).await;

        let quote = provider(&server).fetch_rate("R01235", date()).await.unwrap();

        assert_eq!(quote.date, date());
        assert_eq!(quote.nominal, 1);
        assert_eq!(quote.value, Decimal::new(916359, 4));
    }

    #[tokio::test]
    async fn test_cbr_rate_with_nominal() {
        let body = cbr_body("R01820", "15.03.2024", 100, "61,4425");
        let server = create_cbr_mock_server("R01820", &body, 200).await;

        let quote = provider(&server).fetch_rate("R01820", date()).await.unwrap();

        assert_eq!(quote.nominal, 100);
        assert_eq!(quote.value, Decimal::new(614425, 4));
    }

    #[tokio::test]
    async fn test_cbr_no_record_for_date() {
        let body = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs ID="R01235" DateRange1="15.03.2024" DateRange2="15.03.2024" name="Foreign Currency Market Dynamic"/>"#;
        let server = create_cbr_mock_server("R01235", body, 200).await;

        let err = provider(&server)
            .fetch_rate("R01235", date())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "CBR published no rate for R01235 on 2024-03-15");
    }

    #[tokio::test]
    async fn test_cbr_record_for_other_date_is_ignored() {
        let body = cbr_body("R01235", "14.03.2024", 1, "91,0000");
        let server = create_cbr_mock_server("R01235", &body, 200).await;

        let result = provider(&server).fetch_rate("R01235", date()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cbr_malformed_response() {
        let body = r#"<ValCurs ID="R01239"><Record Date="15.03.2024" Id="R01239"><Nominal>1</Nominal></Record></ValCurs>"#;
        let server = create_cbr_mock_server("R01239", body, 200).await;

        let err = provider(&server)
            .fetch_rate("R01239", date())
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to parse CBR response for R01239")
        );
    }

    #[tokio::test]
    async fn test_cbr_invalid_value() {
        let body = cbr_body("R01239", "15.03.2024", 1, "n/a");
        let server = create_cbr_mock_server("R01239", &body, 200).await;

        let err = provider(&server)
            .fetch_rate("R01239", date())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid CBR rate for R01239");
    }

    #[tokio::test]
    async fn test_cbr_server_error() {
        let server = create_cbr_mock_server("R01235", "Server Error", 500).await;

        let err = provider(&server)
            .fetch_rate("R01235", date())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to download CBR rate for R01235");
        assert!(format!("{err:#}").contains("500"));
    }
}
