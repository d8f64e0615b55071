//! Repository traits over the "opaque relational store" spec §1/§6.4
//! deliberately leaves unspecified at the DDL level. The only binding
//! contracts are the uniqueness constraints of spec §6.4:
//! `(wallet_id, tx_hash)` unique, `Account.label` unique,
//! `(symbol, timestamp_hour)` unique on the price cache.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::errors::LedgerResult;
use crate::model::*;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait EntityRepo {
    fn create_entity(&self, entity: &Entity) -> LedgerResult<()>;
    fn get_entity(&self, id: Uuid) -> LedgerResult<Option<Entity>>;
    fn get_entity_by_name(&self, name: &str) -> LedgerResult<Option<Entity>>;
}

pub trait WalletRepo {
    fn create_wallet(&self, wallet: &Wallet) -> LedgerResult<()>;
    fn get_wallet(&self, id: Uuid) -> LedgerResult<Option<Wallet>>;
    fn list_wallets_for_entity(&self, entity_id: Uuid) -> LedgerResult<Vec<Wallet>>;
    fn update_wallet(&self, wallet: &Wallet) -> LedgerResult<()>;
}

/// `get_or_create` is the label-unique, race-tolerant primitive
/// invariant I3 depends on: a concurrent second creator must observe
/// the first (spec §4.2).
pub trait AccountRepo {
    fn get_or_create_account(&self, account: &Account) -> LedgerResult<Account>;
    fn get_account(&self, id: Uuid) -> LedgerResult<Option<Account>>;
}

pub trait TransactionRepo {
    /// Returns `false` without inserting if `(wallet_id, tx_hash)`
    /// already exists — the no-op re-ingestion path of invariant I1.
    fn insert_transaction_if_absent(&self, tx: &Transaction) -> LedgerResult<bool>;
    fn list_loaded_for_wallet(&self, wallet_id: Uuid) -> LedgerResult<Vec<Transaction>>;
    fn update_transaction_status(
        &self,
        tx_id: Uuid,
        status: TransactionStatus,
        entry_type: Option<EntryType>,
    ) -> LedgerResult<()>;
    fn insert_parse_error(&self, record: &ParseErrorRecord) -> LedgerResult<()>;
}

pub trait JournalRepo {
    fn insert_entry(&self, entry: &JournalEntry) -> LedgerResult<()>;
    fn list_entries_for_entity_in_range(
        &self,
        entity_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<JournalEntry>>;
}

/// "Insert if absent, ignore conflict" — the real-world equivalent of
/// the source's nested-savepoint drop-the-late-writer semantics
/// (spec §4.5 step 4, §9 "Price cache race").
pub trait PriceCacheRepo {
    fn get_price(&self, symbol: &str, hour: DateTime<Utc>) -> LedgerResult<Option<PriceCacheEntry>>;
    fn insert_price_if_absent(&self, entry: &PriceCacheEntry) -> LedgerResult<PriceCacheEntry>;
}

pub trait LotRepo {
    fn clear_lots_for_entity(&self, entity_id: Uuid) -> LedgerResult<()>;
    fn insert_closed_lots(&self, lots: &[ClosedLot]) -> LedgerResult<()>;
    fn insert_open_lots(&self, lots: &[OpenLot]) -> LedgerResult<()>;
    fn insert_taxable_transfers(&self, records: &[TaxableTransferRecord]) -> LedgerResult<()>;
}
