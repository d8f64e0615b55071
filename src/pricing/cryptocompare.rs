//! CryptoCompare historical-price provider (spec §4.5, fallback source).

use super::symbol_resolution::resolve_cryptocompare_symbol;
use crate::logger::{self, LogTag};
use crate::rate_limiter::{RateLimitedRequest, CRYPTOCOMPARE_LIMITER};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

const BASE_URL: &str = "https://min-api.cryptocompare.com";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct HistoHourResponse {
    #[serde(rename = "Data")]
    data: HistoHourData,
}

#[derive(Debug, Deserialize)]
struct HistoHourData {
    #[serde(rename = "Data", default)]
    points: Vec<HistoHourPoint>,
}

#[derive(Debug, Deserialize)]
struct HistoHourPoint {
    close: f64,
}

#[derive(Debug, Clone)]
pub struct CryptoCompareProvider {
    client: Client,
    api_key: String,
}

impl CryptoCompareProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// Fetches the USD close price nearest `timestamp` (Unix seconds)
    /// via the hourly histogram endpoint.
    pub async fn get_price(&self, symbol: &str, timestamp: i64) -> Option<Decimal> {
        let cc_symbol = resolve_cryptocompare_symbol(symbol)?;

        let mut url = format!(
            "{BASE_URL}/data/v2/histohour?fsym={cc_symbol}&tsym=USD&limit=1&toTs={timestamp}"
        );
        if !self.api_key.is_empty() {
            url.push_str(&format!("&api_key={}", self.api_key));
        }

        for attempt in 0..MAX_RETRIES {
            let response = match self.client.get_with_rate_limit(&url, &CRYPTOCOMPARE_LIMITER).await {
                Ok(r) => r,
                Err(e) => {
                    logger::warning(LogTag::Pricing, &format!("CryptoCompare request failed for {symbol}: {e}"));
                    continue;
                }
            };

            if response.status().as_u16() == 429 {
                let wait = 2u64.pow(attempt + 1);
                logger::info(LogTag::Pricing, &format!("CryptoCompare 429 for {symbol}, waiting {wait}s"));
                tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                continue;
            }

            if !response.status().is_success() {
                logger::warning(LogTag::Pricing, &format!("CryptoCompare returned {} for {symbol}", response.status()));
                return None;
            }

            let parsed: HistoHourResponse = match response.json().await {
                Ok(p) => p,
                Err(e) => {
                    logger::warning(LogTag::Pricing, &format!("CryptoCompare response parse failed for {symbol}: {e}"));
                    return None;
                }
            };

            let Some(closest) = parsed.data.points.last() else { return None };
            if closest.close <= 0.0 {
                return None;
            }
            return Decimal::from_f64(closest.close);
        }

        logger::warning(LogTag::Pricing, &format!("CryptoCompare exhausted retries for {symbol}"));
        None
    }
}
