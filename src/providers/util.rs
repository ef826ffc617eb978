use anyhow::{Context, Result, anyhow};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("ratekeeper/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by all providers for one run.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Sends a GET request and returns the body of a successful response.
///
/// Non-2xx statuses and empty bodies are errors; there is no retry.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!("Requesting {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {url}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Unexpected status {} from {}", status, url));
    }

    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {url}"))?;
    if text.trim().is_empty() {
        return Err(anyhow!("Received empty response from {}", url));
    }
    Ok(text)
}

/// Parses a bank-formatted decimal, accepting `,` as the decimal separator.
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let normalized = s.trim().replace(',', ".");
    Decimal::from_str(&normalized).with_context(|| format!("Invalid decimal value: '{s}'"))
}
