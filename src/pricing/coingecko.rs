//! CoinGecko historical-price provider (spec §4.5, primary source).

use super::symbol_resolution::{resolve_coingecko_id, STABLECOINS};
use crate::logger::{self, LogTag};
use crate::rate_limiter::{RateLimitedRequest, COINGECKO_LIMITER};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

const BASE_URL: &str = "https://api.coingecko.com";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<(i64, f64)>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoProvider {
    client: Client,
    api_key: String,
}

impl CoinGeckoProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// Fetches the USD price for `symbol` closest to `timestamp`
    /// (Unix seconds), querying a 2-hour window around it. Retries on
    /// HTTP 429 with exponential backoff (2s, 4s, 8s).
    pub async fn get_price(&self, symbol: &str, timestamp: i64) -> Option<Decimal> {
        let upper = symbol.to_uppercase();
        if STABLECOINS.contains(upper.as_str()) {
            return Some(Decimal::ONE);
        }

        let coin_id = resolve_coingecko_id(symbol)?;
        let from_ts = timestamp - 3600;
        let to_ts = timestamp + 3600;

        let mut url = format!(
            "{BASE_URL}/api/v3/coins/{coin_id}/market_chart/range?vs_currency=usd&from={from_ts}&to={to_ts}"
        );
        if !self.api_key.is_empty() {
            url.push_str(&format!("&x_cg_demo_api_key={}", self.api_key));
        }

        for attempt in 0..MAX_RETRIES {
            let response = match self.client.get_with_rate_limit(&url, &COINGECKO_LIMITER).await {
                Ok(r) => r,
                Err(e) => {
                    logger::warning(LogTag::Pricing, &format!("CoinGecko request failed for {symbol}: {e}"));
                    continue;
                }
            };

            if response.status().as_u16() == 429 {
                let wait = 2u64.pow(attempt + 1);
                logger::info(LogTag::Pricing, &format!("CoinGecko 429 for {symbol}, waiting {wait}s"));
                tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                continue;
            }

            if !response.status().is_success() {
                logger::warning(LogTag::Pricing, &format!("CoinGecko returned {} for {symbol}", response.status()));
                return None;
            }

            let parsed: MarketChartResponse = match response.json().await {
                Ok(p) => p,
                Err(e) => {
                    logger::warning(LogTag::Pricing, &format!("CoinGecko response parse failed for {symbol}: {e}"));
                    return None;
                }
            };

            if parsed.prices.is_empty() {
                return None;
            }

            let target_ms = timestamp * 1000;
            let closest = parsed.prices.iter().min_by_key(|(ms, _)| (ms - target_ms).abs())?;
            return Decimal::from_f64(closest.1);
        }

        logger::warning(LogTag::Pricing, &format!("CoinGecko exhausted retries for {symbol}"));
        None
    }
}
