use super::*;
use crate::errors::LedgerError;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::Mutex;

/// A single `rusqlite::Connection` behind a mutex, following the
/// teacher's `database::connection::Database` shape: open, then run
/// idempotent `CREATE TABLE IF NOT EXISTS` statements once.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

unsafe impl Send for SqliteStore {}
unsafe impl Sync for SqliteStore {}

impl SqliteStore {
    pub fn new(path: &str) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_tables()?;
        Ok(store)
    }

    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_tables()?;
        Ok(store)
    }

    fn initialize_tables(&self) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS wallets (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL UNIQUE,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                wallet_id TEXT NOT NULL,
                tx_hash TEXT NOT NULL,
                block_number INTEGER NOT NULL,
                status TEXT NOT NULL,
                data TEXT NOT NULL,
                UNIQUE(wallet_id, tx_hash)
            );
            CREATE TABLE IF NOT EXISTS parse_errors (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS price_cache (
                symbol TEXT NOT NULL,
                timestamp_hour TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (symbol, timestamp_hour)
            );
            CREATE TABLE IF NOT EXISTS closed_lots (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS open_lots (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS taxable_transfers (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tx_wallet ON transactions(wallet_id, block_number);
            ",
        )?;
        Ok(())
    }
}

impl EntityRepo for SqliteStore {
    fn create_entity(&self, entity: &Entity) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO entities (id, data) VALUES (?1, ?2)",
            params![entity.id.to_string(), serde_json::to_string(entity)?],
        )?;
        Ok(())
    }

    fn get_entity(&self, id: Uuid) -> LedgerResult<Option<Entity>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM entities WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    fn get_entity_by_name(&self, name: &str) -> LedgerResult<Option<Entity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM entities")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            let entity: Entity = serde_json::from_str(&data)?;
            if entity.name == name {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}

impl WalletRepo for SqliteStore {
    fn create_wallet(&self, wallet: &Wallet) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO wallets (id, entity_id, data) VALUES (?1, ?2, ?3)",
            params![
                wallet.id().to_string(),
                wallet.entity_id().to_string(),
                serde_json::to_string(wallet)?
            ],
        )?;
        Ok(())
    }

    fn get_wallet(&self, id: Uuid) -> LedgerResult<Option<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM wallets WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    fn list_wallets_for_entity(&self, entity_id: Uuid) -> LedgerResult<Vec<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT data FROM wallets WHERE entity_id = ?1")?;
        let rows = stmt.query_map(params![entity_id.to_string()], |row| {
            let data: String = row.get(0)?;
            Ok(data)
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    fn update_wallet(&self, wallet: &Wallet) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET data = ?1 WHERE id = ?2",
            params![serde_json::to_string(wallet)?, wallet.id().to_string()],
        )?;
        Ok(())
    }
}

impl AccountRepo for SqliteStore {
    fn get_or_create_account(&self, account: &Account) -> LedgerResult<Account> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO accounts (id, label, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(label) DO NOTHING",
            params![
                account.id.to_string(),
                account.label,
                serde_json::to_string(account)?
            ],
        )?;
        let data: String = conn.query_row(
            "SELECT data FROM accounts WHERE label = ?1",
            params![account.label],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&data)?)
    }

    fn get_account(&self, id: Uuid) -> LedgerResult<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM accounts WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.map(|d| serde_json::from_str(&d)).transpose()?)
    }
}

impl TransactionRepo for SqliteStore {
    fn insert_transaction_if_absent(&self, tx: &Transaction) -> LedgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT INTO transactions (id, wallet_id, tx_hash, block_number, status, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(wallet_id, tx_hash) DO NOTHING",
            params![
                tx.id.to_string(),
                tx.wallet_id.to_string(),
                tx.tx_hash,
                tx.block_number,
                status_str(tx.status),
                serde_json::to_string(tx)?
            ],
        )?;
        Ok(changed > 0)
    }

    fn list_loaded_for_wallet(&self, wallet_id: Uuid) -> LedgerResult<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT data FROM transactions WHERE wallet_id = ?1 AND status = 'loaded'
             ORDER BY block_number ASC",
        )?;
        let rows = stmt.query_map(params![wallet_id.to_string()], |row| {
            let data: String = row.get(0)?;
            Ok(data)
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    fn update_transaction_status(
        &self,
        tx_id: Uuid,
        status: TransactionStatus,
        entry_type: Option<EntryType>,
    ) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let data: String = conn.query_row(
            "SELECT data FROM transactions WHERE id = ?1",
            params![tx_id.to_string()],
            |row| row.get(0),
        )?;
        let mut tx: Transaction = serde_json::from_str(&data)?;
        tx.status = status;
        tx.entry_type = entry_type;
        conn.execute(
            "UPDATE transactions SET status = ?1, data = ?2 WHERE id = ?3",
            params![status_str(status), serde_json::to_string(&tx)?, tx_id.to_string()],
        )?;
        Ok(())
    }

    fn insert_parse_error(&self, record: &ParseErrorRecord) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO parse_errors (id, data) VALUES (?1, ?2)",
            params![record.id.to_string(), serde_json::to_string(record)?],
        )?;
        Ok(())
    }
}

fn status_str(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Loaded => "loaded",
        TransactionStatus::Parsed => "parsed",
        TransactionStatus::Error => "error",
        TransactionStatus::Ignored => "ignored",
    }
}

impl JournalRepo for SqliteStore {
    fn insert_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO journal_entries (id, entity_id, timestamp, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id.to_string(),
                entry.entity_id.to_string(),
                entry.timestamp.to_rfc3339(),
                serde_json::to_string(entry)?
            ],
        )?;
        Ok(())
    }

    fn list_entries_for_entity_in_range(
        &self,
        entity_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT data FROM journal_entries
             WHERE entity_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(
            params![entity_id.to_string(), start.to_rfc3339(), end.to_rfc3339()],
            |row| {
                let data: String = row.get(0)?;
                Ok(data)
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}

impl PriceCacheRepo for SqliteStore {
    fn get_price(&self, symbol: &str, hour: DateTime<Utc>) -> LedgerResult<Option<PriceCacheEntry>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM price_cache WHERE symbol = ?1 AND timestamp_hour = ?2",
                params![symbol, hour.to_rfc3339()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    /// "Insert if absent, ignore conflict": a concurrent duplicate
    /// write collapses into the first writer's row without touching
    /// it — the nested-savepoint "drop the late writer" semantics of
    /// spec §4.5/§9, implemented with the primitive SQLite actually
    /// offers for it.
    fn insert_price_if_absent(&self, entry: &PriceCacheEntry) -> LedgerResult<PriceCacheEntry> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO price_cache (symbol, timestamp_hour, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(symbol, timestamp_hour) DO NOTHING",
            params![
                entry.symbol,
                entry.timestamp_hour.to_rfc3339(),
                serde_json::to_string(entry)?
            ],
        )?;
        let data: String = conn.query_row(
            "SELECT data FROM price_cache WHERE symbol = ?1 AND timestamp_hour = ?2",
            params![entry.symbol, entry.timestamp_hour.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl LotRepo for SqliteStore {
    fn clear_lots_for_entity(&self, entity_id: Uuid) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        let id = entity_id.to_string();
        conn.execute("DELETE FROM closed_lots WHERE entity_id = ?1", params![id])?;
        conn.execute("DELETE FROM open_lots WHERE entity_id = ?1", params![id])?;
        conn.execute(
            "DELETE FROM taxable_transfers WHERE entity_id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn insert_closed_lots(&self, lots: &[ClosedLot]) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        for lot in lots {
            conn.execute(
                "INSERT INTO closed_lots (id, entity_id, data) VALUES (?1, ?2, ?3)",
                params![
                    lot.id.to_string(),
                    lot.entity_id.to_string(),
                    serde_json::to_string(lot)?
                ],
            )?;
        }
        Ok(())
    }

    fn insert_open_lots(&self, lots: &[OpenLot]) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        for lot in lots {
            conn.execute(
                "INSERT INTO open_lots (id, entity_id, data) VALUES (?1, ?2, ?3)",
                params![
                    lot.id.to_string(),
                    lot.entity_id.to_string(),
                    serde_json::to_string(lot)?
                ],
            )?;
        }
        Ok(())
    }

    fn insert_taxable_transfers(&self, records: &[TaxableTransferRecord]) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        for record in records {
            conn.execute(
                "INSERT INTO taxable_transfers (id, entity_id, data) VALUES (?1, ?2, ?3)",
                params![
                    record.id.to_string(),
                    record.entity_id.to_string(),
                    serde_json::to_string(record)?
                ],
            )?;
        }
        Ok(())
    }
}

#[allow(dead_code)]
fn decimal_from_str(s: &str) -> LedgerResult<rust_decimal::Decimal> {
    rust_decimal::Decimal::from_str(s)
        .map_err(|e| LedgerError::Config(format!("invalid decimal '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_creation_is_idempotent_on_label() {
        let store = SqliteStore::in_memory().unwrap();
        let account = Account {
            id: Uuid::new_v4(),
            label: "eth:0xabc:native_asset".to_string(),
            account_type: crate::model::AccountType::Asset,
            subtype: crate::model::AccountSubtype::NativeAsset,
            symbol: "ETH".to_string(),
            token_address: None,
            protocol: None,
            balance_type: None,
        };
        let first = store.get_or_create_account(&account).unwrap();

        let mut dup = account.clone();
        dup.id = Uuid::new_v4();
        let second = store.get_or_create_account(&dup).unwrap();

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn transaction_reingestion_is_a_noop() {
        let store = SqliteStore::in_memory().unwrap();
        let tx = Transaction {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            chain: "ethereum".to_string(),
            tx_hash: "0xdead".to_string(),
            block_number: 100,
            timestamp: Utc::now(),
            raw_data: serde_json::json!({}),
            status: TransactionStatus::Loaded,
            entry_type: None,
        };
        assert!(store.insert_transaction_if_absent(&tx).unwrap());
        assert!(!store.insert_transaction_if_absent(&tx).unwrap());
    }

    #[test]
    fn price_cache_write_keeps_first_writer() {
        let store = SqliteStore::in_memory().unwrap();
        let hour = Utc::now();
        let first = PriceCacheEntry {
            symbol: "ETH".to_string(),
            timestamp_hour: hour,
            price_usd: rust_decimal::Decimal::new(2000, 0),
            source: "coingecko".to_string(),
        };
        let stored_first = store.insert_price_if_absent(&first).unwrap();

        let mut conflicting = first.clone();
        conflicting.price_usd = rust_decimal::Decimal::new(9999, 0);
        conflicting.source = "cryptocompare".to_string();
        let stored_second = store.insert_price_if_absent(&conflicting).unwrap();

        assert_eq!(stored_first.price_usd, stored_second.price_usd);
        assert_eq!(stored_second.source, "coingecko");
    }
}
