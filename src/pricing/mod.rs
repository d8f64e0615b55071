//! Historical USD pricing: cache-first lookup across a CoinGecko →
//! CryptoCompare provider chain (spec §4.5).

mod cache;
mod coingecko;
mod cryptocompare;
mod symbol_resolution;

pub use cache::PriceService;
pub use coingecko::CoinGeckoProvider;
pub use cryptocompare::CryptoCompareProvider;
pub use symbol_resolution::{resolve_coingecko_id, resolve_cryptocompare_symbol, STABLECOINS};
