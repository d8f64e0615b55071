//! `PriceService` — cache lookup → provider fetch → cache store
//! (spec §4.5), exposed to the bookkeeper through a synchronous
//! `PriceOracle` bridge (the bookkeeper itself is plain synchronous
//! `rusqlite`-backed code; pricing is the one place this crate talks
//! to the network, so the async/sync boundary lives here).

use super::coingecko::CoinGeckoProvider;
use super::cryptocompare::CryptoCompareProvider;
use crate::bookkeeper::PriceOracle;
use crate::errors::LedgerResult;
use crate::logger::{self, LogTag};
use crate::model::{hour_bucket, PriceCacheEntry};
use crate::storage::PriceCacheRepo;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

pub struct PriceService<'a, S: PriceCacheRepo> {
    store: &'a S,
    coingecko: Option<CoinGeckoProvider>,
    cryptocompare: Option<CryptoCompareProvider>,
    usd_vnd_rate: Decimal,
}

impl<'a, S: PriceCacheRepo> PriceService<'a, S> {
    pub fn new(
        store: &'a S,
        coingecko: Option<CoinGeckoProvider>,
        cryptocompare: Option<CryptoCompareProvider>,
        usd_vnd_rate: Decimal,
    ) -> Self {
        Self { store, coingecko, cryptocompare, usd_vnd_rate }
    }

    /// Get USD price for a token at a Unix timestamp. Checks the
    /// cache first, then CoinGecko, then CryptoCompare, caching the
    /// first successful answer.
    pub async fn get_price_usd(&self, symbol: &str, timestamp: DateTime<Utc>) -> LedgerResult<Option<Decimal>> {
        let symbol_upper = symbol.to_uppercase();
        let hour = hour_bucket(timestamp);

        if let Some(cached) = self.store.get_price(&symbol_upper, hour)? {
            return Ok(Some(cached.price_usd));
        }

        let unix_ts = hour.timestamp();
        let mut price = None;
        let mut source = "";

        if let Some(provider) = &self.coingecko {
            price = provider.get_price(symbol, unix_ts).await;
            source = "coingecko";
        }
        if price.is_none() {
            if let Some(provider) = &self.cryptocompare {
                price = provider.get_price(symbol, unix_ts).await;
                source = "cryptocompare";
            }
        }

        let Some(price) = price else {
            logger::debug(LogTag::Pricing, &format!("no price found for {symbol_upper} @ {hour}"));
            return Ok(None);
        };

        let entry = PriceCacheEntry { symbol: symbol_upper, timestamp_hour: hour, price_usd: price, source: source.to_string() };
        let stored = self.store.insert_price_if_absent(&entry)?;
        Ok(Some(stored.price_usd))
    }

    /// `(value_usd, value_vnd)` for `quantity` units of `symbol`,
    /// sign-preserving (spec §4.5 "split pricing").
    pub async fn price_split_async(&self, symbol: &str, quantity: Decimal, timestamp: DateTime<Utc>) -> LedgerResult<(Option<Decimal>, Option<Decimal>)> {
        let Some(unit_price) = self.get_price_usd(symbol, timestamp).await? else {
            return Ok((None, None));
        };

        let mut value_usd = quantity.abs() * unit_price;
        let mut value_vnd = value_usd * self.usd_vnd_rate;
        if quantity.is_sign_negative() {
            value_usd = -value_usd;
            value_vnd = -value_vnd;
        }
        Ok((Some(value_usd), Some(value_vnd)))
    }
}

impl<'a, S: PriceCacheRepo> PriceOracle for PriceService<'a, S> {
    fn price_split(&self, symbol: &str, quantity: Decimal, timestamp_unix: i64) -> (Option<Decimal>, Option<Decimal>) {
        let Some(ts) = Utc.timestamp_opt(timestamp_unix, 0).single() else {
            return (None, None);
        };

        let result = tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.price_split_async(symbol, quantity, ts)));

        match result {
            Ok(pair) => pair,
            Err(e) => {
                logger::warning(LogTag::Pricing, &format!("price lookup failed for {symbol}: {e}"));
                (None, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn stablecoin_split_is_sign_preserving() {
        let store = SqliteStore::in_memory().unwrap();
        let service = PriceService::new(&store, None, None, Decimal::new(25_000, 0));

        let entry = PriceCacheEntry {
            symbol: "USDC".to_string(),
            timestamp_hour: hour_bucket(Utc::now()),
            price_usd: Decimal::ONE,
            source: "test".to_string(),
        };
        store.insert_price_if_absent(&entry).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let (usd, vnd) = rt
            .block_on(service.price_split_async("USDC", Decimal::new(-100, 0), entry.timestamp_hour))
            .unwrap();
        assert_eq!(usd, Some(Decimal::new(-100, 0)));
        assert_eq!(vnd, Some(Decimal::new(-2_500_000, 0)));
    }
}
