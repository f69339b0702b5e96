use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

pub const COINGECKO_SOL_USD_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd";

#[derive(Clone, Debug, PartialEq, Error)]
pub enum PriceFeedError {
    #[error("price request failed: {0}")]
    Request(String),

    #[error("price response invalid: {0}")]
    InvalidResponse(String),
}

/// Source of the SOL/USD rate used for display values
pub trait PriceFeed: Send + Sync + 'static {
    fn sol_usd_price(&self) -> impl Future<Output = Result<f64, PriceFeedError>> + Send;
}

/// Constant rate, for offline use
#[derive(Clone, Copy, Debug)]
pub struct FixedPrice(pub f64);

impl PriceFeed for FixedPrice {
    async fn sol_usd_price(&self) -> Result<f64, PriceFeedError> {
        Ok(self.0)
    }
}

#[derive(Deserialize)]
struct SimplePriceResponse {
    solana: UsdQuote,
}

#[derive(Deserialize)]
struct UsdQuote {
    usd: f64,
}

/// Price feed backed by a CoinGecko-style `simple/price` endpoint
#[derive(Clone, Debug)]
pub struct HttpPriceFeed {
    http: reqwest::Client,
    url: String,
}

impl HttpPriceFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn coingecko() -> Self {
        Self::new(COINGECKO_SOL_USD_URL)
    }
}

fn parse_price(body: &str) -> Result<f64, PriceFeedError> {
    let response: SimplePriceResponse =
        serde_json::from_str(body).map_err(|e| PriceFeedError::InvalidResponse(e.to_string()))?;
    let price = response.solana.usd;
    if !price.is_finite() || price <= 0.0 {
        return Err(PriceFeedError::InvalidResponse(format!(
            "non-positive price {}",
            price
        )));
    }
    Ok(price)
}

impl PriceFeed for HttpPriceFeed {
    async fn sol_usd_price(&self) -> Result<f64, PriceFeedError> {
        let body = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PriceFeedError::Request(e.to_string()))?
            .text()
            .await
            .map_err(|e| PriceFeedError::Request(e.to_string()))?;
        parse_price(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_price() {
        assert_eq!(parse_price(r#"{"solana":{"usd":187.25}}"#).unwrap(), 187.25);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_price(r#"{"bitcoin":{"usd":1}}"#).is_err());
        assert!(parse_price(r#"{"solana":{"usd":0}}"#).is_err());
    }
}
