//! Core entity and journal types shared across the pipeline.
//!
//! Wallets and accounts are modeled as tagged sums rather than
//! single-table inheritance: the source system stores them in one
//! polymorphic table, but in Rust the variant set is closed and known
//! up front, so an enum is the natural fit.

mod account;
mod entity;
mod journal;
mod lots;
mod price_cache;
mod transaction;
mod wallet;

pub use account::{Account, AccountSubtype, AccountType};
pub use entity::Entity;
pub use journal::{EntryType, JournalEntry, JournalSplit, MULTI_SYMBOL};
pub use lots::{ClosedLot, OpenLot, TaxableTransferRecord};
pub use price_cache::PriceCacheEntry;
pub use transaction::{ParseErrorRecord, Transaction, TransactionStatus};
pub use wallet::{SyncStatus, Wallet};

use chrono::{DateTime, Timelike, Utc};

/// Floor `ts` to the start of its UTC hour, matching the cache key used
/// throughout the pricing layer.
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
