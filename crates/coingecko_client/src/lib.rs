//! CoinGecko price client.
//!
//! Fetches batched USD quotes from the `simple/price` endpoint and converts
//! them to the shared `PriceQuote` format.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{Error, PriceQuote, PriceSource};
use serde::Deserialize;
use tracing::debug;

const VS_CURRENCY: &str = "usd";

/// CoinGecko API client.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

/// One asset entry of the `simple/price` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SimplePriceEntry {
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_market_cap: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}

/// `simple/price` response: asset id → entry.
pub type SimplePriceResponse = HashMap<String, SimplePriceEntry>;

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("nexus-dashboard/0.1")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .expect("failed to build CoinGecko HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the raw price map for `ids`.
    pub async fn fetch_simple_price(&self, ids: &[String]) -> Result<SimplePriceResponse, Error> {
        let url = format!("{}/simple/price", self.base_url);
        let joined = ids.join(",");

        debug!("Fetching CoinGecko prices: {} ids={}", url, joined);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("ids", joined.as_str()),
                ("vs_currencies", VS_CURRENCY),
                ("include_market_cap", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("CoinGecko request failed: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status,
                message: body.chars().take(500).collect(),
            });
        }

        resp.json()
            .await
            .map_err(|e| Error::Parse(format!("CoinGecko payload: {e}")))
    }
}

impl PriceSource for CoinGeckoClient {
    async fn fetch_prices(&self, ids: &[String]) -> Result<Vec<PriceQuote>, Error> {
        let raw = self.fetch_simple_price(ids).await?;
        Ok(to_quotes(ids, raw, Utc::now()))
    }
}

/// Quotes for the requested ids, in request order. Ids missing from the
/// response are skipped.
fn to_quotes(ids: &[String], mut raw: SimplePriceResponse, now: DateTime<Utc>) -> Vec<PriceQuote> {
    let mut quotes = Vec::with_capacity(raw.len());
    for id in ids {
        let Some(entry) = raw.remove(id) else {
            debug!("CoinGecko has no data for {}", id);
            continue;
        };
        quotes.push(PriceQuote {
            asset_id: id.clone(),
            price_usd: entry.usd,
            market_cap_usd: entry.usd_market_cap,
            change_24h_pct: entry.usd_24h_change,
            fetched_at: now,
        });
    }
    quotes
}
