//! Price fetcher backed by the CoinGecko `simple/price` endpoint.
//!
//! Failures never reach the caller: they are logged and turned into `None`.
//! There is no retry and no cache, every call hits the API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Current USD price and 24 hour change of one coin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    /// Percentage change over the last 24 hours
    pub change_24h: f64,
}

/// Source of current prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Quote for a CoinGecko coin id, `None` on any failure
    async fn quote(&self, coin_id: &str) -> Option<Quote>;
}

/// HTTP client for the CoinGecko API
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    /// Create a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coin-media-bots/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, coin_id: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[
                ("ids", coin_id),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn quote(&self, coin_id: &str) -> Option<Quote> {
        match self.fetch(coin_id).await {
            Ok(body) => {
                let quote = parse_quote(&body, coin_id);
                if quote.is_none() {
                    error!("Error fetching price: no usable quote for `{coin_id}` in response");
                }
                debug!(coin_id, ?quote, "Price fetched");
                quote
            }
            Err(e) => {
                error!("Error fetching price for `{coin_id}`: {e}");
                None
            }
        }
    }
}

/// Extract `{coin_id: {usd, usd_24h_change}}` from a `simple/price` body.
///
/// Missing fields and non-finite numbers yield `None`.
#[must_use]
pub fn parse_quote(body: &Value, coin_id: &str) -> Option<Quote> {
    let entry = body.get(coin_id)?;
    let price = entry.get("usd")?.as_f64()?;
    let change_24h = entry.get("usd_24h_change")?.as_f64()?;
    if !price.is_finite() || !change_24h.is_finite() {
        return None;
    }
    Some(Quote { price, change_24h })
}
