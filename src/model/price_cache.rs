use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Keyed uniquely by `(symbol, timestamp_hour)`; immutable once
/// written (invariant I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCacheEntry {
    pub symbol: String,
    pub timestamp_hour: DateTime<Utc>,
    pub price_usd: Decimal,
    pub source: String,
}
