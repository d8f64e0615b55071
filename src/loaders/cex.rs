//! Binance: authenticated REST client + wallet loader (spec §4.7.4),
//! and the Transaction History CSV importer (spec §4.4 CEX parsers).

use crate::bookkeeper::Bookkeeper;
use crate::config::with_config;
use crate::errors::{LedgerError, LedgerResult};
use crate::logger::{self, LogTag};
use crate::model::{SyncStatus, Transaction, TransactionStatus, Wallet};
use crate::parsers::binance::csv::{parse_rows, CsvRow};
use crate::rate_limiter::{RateLimitedRequest, BINANCE_LIMITER};
use crate::storage::{AccountRepo, JournalRepo, TransactionRepo, WalletRepo};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const BASE_URL: &str = "https://api.binance.com";

pub struct BinanceClient {
    client: Client,
    api_key: String,
    api_secret: String,
    max_retries: u32,
}

impl BinanceClient {
    pub fn new(client: Client, api_key: String, api_secret: String) -> Self {
        let max_retries = with_config(|c| c.loaders.binance_max_retries);
        Self { client, api_key, api_secret, max_retries }
    }

    fn sign(&self, params: &mut Vec<(String, String)>) {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis();
        params.push(("timestamp".to_string(), timestamp.to_string()));

        let query = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        params.push(("signature".to_string(), signature));
    }

    async fn get_signed(&self, path: &str, mut params: Vec<(String, String)>) -> LedgerResult<Value> {
        self.sign(&mut params);
        let query = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let url = format!("{BASE_URL}{path}?{query}");

        let mut attempt = 0;
        loop {
            BINANCE_LIMITER.wait_for_request().await;
            let response = self
                .client
                .get(&url)
                .header("X-MBX-APIKEY", &self.api_key)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(LedgerError::Http(e));
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(attempt as u64)).await;
                    continue;
                }
            };

            let data: Value = response.json().await?;

            if let Some(code) = data.get("code").and_then(Value::as_i64) {
                if code != 200 {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        let msg = data.get("msg").and_then(Value::as_str).unwrap_or("").to_string();
                        return Err(LedgerError::ExternalService { provider: "binance".to_string(), detail: format!("{code}: {msg}") });
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(attempt as u64)).await;
                    continue;
                }
            }

            return Ok(data);
        }
    }

    pub async fn get_spot_trades(&self, symbol: &str, start_time: Option<i64>) -> LedgerResult<Vec<Value>> {
        let mut params = vec![("symbol".to_string(), symbol.to_string()), ("limit".to_string(), "1000".to_string())];
        if let Some(ts) = start_time {
            params.push(("startTime".to_string(), ts.to_string()));
        }
        let data = self.get_signed("/api/v3/myTrades", params).await?;
        Ok(data.as_array().cloned().unwrap_or_default())
    }

    pub async fn get_active_symbols(&self) -> LedgerResult<Vec<String>> {
        let response = self.client.get_with_rate_limit(&format!("{BASE_URL}/api/v3/exchangeInfo"), &BINANCE_LIMITER).await?;
        let data: Value = response.json().await?;
        let symbols = data
            .get("symbols")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter(|s| s.get("status").and_then(Value::as_str) == Some("TRADING"))
                    .filter_map(|s| s.get("symbol").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(symbols)
    }

    pub async fn get_deposits(&self, start_time: Option<i64>) -> LedgerResult<Vec<Value>> {
        let mut params = Vec::new();
        if let Some(ts) = start_time {
            params.push(("startTime".to_string(), ts.to_string()));
        }
        let data = self.get_signed("/sapi/v1/capital/deposit/hisrec", params).await?;
        Ok(data.as_array().cloned().unwrap_or_default())
    }

    pub async fn get_withdrawals(&self, start_time: Option<i64>) -> LedgerResult<Vec<Value>> {
        let mut params = Vec::new();
        if let Some(ts) = start_time {
            params.push(("startTime".to_string(), ts.to_string()));
        }
        let data = self.get_signed("/sapi/v1/capital/withdraw/history", params).await?;
        Ok(data.as_array().cloned().unwrap_or_default())
    }
}

fn tx_hash_for(prefix: &str, id: &str) -> String {
    format!("binance_{prefix}_{id}")
}

fn record_id<'a>(record: &'a Value, keys: &[&str], default: &'a str) -> String {
    for key in keys {
        if let Some(v) = record.get(key) {
            if let Some(s) = v.as_str() {
                return s.to_string();
            }
            if let Some(n) = v.as_i64() {
                return n.to_string();
            }
        }
    }
    default.to_string()
}

/// Loads new trades/deposits/withdrawals for a Binance CEX wallet.
/// `wallet.last_synced_at` is the `startTime` cursor for all three
/// pulls; each record becomes a `Transaction(chain = "binance")` with
/// a synthetic, dedup-stable `tx_hash`.
pub async fn load_wallet<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, client: &BinanceClient) -> LedgerResult<usize> {
    wallet.set_sync_status(SyncStatus::Syncing);
    store.update_wallet(wallet)?;

    match do_load(store, wallet, client).await {
        Ok(count) => {
            wallet.set_sync_status(SyncStatus::Synced);
            if let Wallet::Cex(cex) = wallet {
                cex.last_synced_at = Some(chrono::Utc::now());
            }
            store.update_wallet(wallet)?;
            logger::info(LogTag::CexLoader, &format!("binance sync: {count} new txs for wallet {}", wallet.id()));
            Ok(count)
        }
        Err(e) => {
            wallet.set_sync_status(SyncStatus::Error);
            let _ = store.update_wallet(wallet);
            logger::error(LogTag::CexLoader, &format!("binance sync failed for wallet {}: {e}", wallet.id()));
            Err(e)
        }
    }
}

async fn do_load<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, client: &BinanceClient) -> LedgerResult<usize> {
    let Wallet::Cex(cex) = wallet else {
        return Err(LedgerError::Config("Binance loader requires a CEX wallet".to_string()));
    };

    let existing_hashes: HashSet<String> = store.list_loaded_for_wallet(cex.id)?.into_iter().map(|tx| tx.tx_hash).collect();
    let start_time = cex.last_synced_at.map(|t| t.timestamp_millis());

    let symbols = client.get_active_symbols().await?;
    let mut records: Vec<Transaction> = Vec::new();

    for symbol in symbols {
        let trades = client.get_spot_trades(&symbol, start_time).await?;
        for trade in trades {
            let id = record_id(&trade, &["id", "orderId"], "unknown");
            let hash = tx_hash_for("trade", &id);
            if existing_hashes.contains(&hash) {
                continue;
            }
            let timestamp = trade.get("time").and_then(Value::as_i64).unwrap_or(0) / 1000;
            records.push(build_record(cex.id, hash, timestamp, trade));
        }
    }

    for deposit in client.get_deposits(start_time).await? {
        let id = record_id(&deposit, &["txId", "id"], "unknown");
        let hash = tx_hash_for("deposit", &id);
        if existing_hashes.contains(&hash) {
            continue;
        }
        let timestamp = deposit.get("insertTime").and_then(Value::as_i64).unwrap_or(0) / 1000;
        records.push(build_record(cex.id, hash, timestamp, deposit));
    }

    for withdrawal in client.get_withdrawals(start_time).await? {
        let id = record_id(&withdrawal, &["id"], "unknown");
        let hash = tx_hash_for("withdraw", &id);
        if existing_hashes.contains(&hash) {
            continue;
        }
        let timestamp = withdrawal
            .get("applyTime")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s.replace('Z', "+00:00")).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or(0);
        records.push(build_record(cex.id, hash, timestamp, withdrawal));
    }

    let mut inserted = 0;
    for tx in &records {
        if store.insert_transaction_if_absent(tx)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

fn build_record(wallet_id: uuid::Uuid, tx_hash: String, timestamp: i64, mut raw: Value) -> Transaction {
    if let Some(obj) = raw.as_object_mut() {
        obj.insert("chain".to_string(), Value::String("binance".to_string()));
    }
    Transaction {
        id: uuid::Uuid::new_v4(),
        wallet_id,
        chain: "binance".to_string(),
        tx_hash,
        block_number: 0,
        timestamp: chrono::DateTime::from_timestamp(timestamp, 0).unwrap_or_else(chrono::Utc::now),
        raw_data: raw,
        status: TransactionStatus::Loaded,
        entry_type: None,
    }
}

/// Imports a Binance Transaction History CSV export directly into
/// journal entries, bypassing the `Transaction`/parser pipeline
/// entirely: a CSV row group is already a fully-formed set of splits,
/// not a raw blob a `Parser` needs to interpret.
pub fn import_csv<S: AccountRepo + TransactionRepo + JournalRepo>(
    bookkeeper: &Bookkeeper<'_, S>,
    wallet: &Wallet,
    entity_id: uuid::Uuid,
    csv_path: &std::path::Path,
) -> LedgerResult<CsvImportStats> {
    let rows = read_csv_rows(csv_path)?;
    let (parsed, skipped, stats) = parse_rows(&rows);

    for entry in &parsed {
        let timestamp = chrono::DateTime::parse_from_str(&entry.utc_time, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());

        bookkeeper.commit_entry(
            entity_id,
            wallet,
            entry.entry_type,
            timestamp,
            format!("Binance CSV import: {}", entry.utc_time),
            None,
            &entry.splits,
        )?;
    }

    for skip in &skipped {
        logger::warning(LogTag::CexLoader, &format!("CSV row {}: {}", skip.row_number, skip.reason));
    }

    Ok(CsvImportStats { total: stats.total, imported: stats.parsed, skipped: stats.skipped, errors: stats.errors })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvImportStats {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
}

fn read_csv_rows(path: &std::path::Path) -> LedgerResult<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let col = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let utc_time_idx = col("UTC_Time").unwrap_or(1);
    let account_idx = col("Account").unwrap_or(2);
    let operation_idx = col("Operation").unwrap_or(3);
    let coin_idx = col("Coin").unwrap_or(4);
    let change_idx = col("Change").unwrap_or(5);
    let remark_idx = col("Remark");

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let get = |idx: usize| record.get(idx).unwrap_or("");
        rows.push(CsvRow::from_fields(
            i as i64 + 1,
            get(utc_time_idx),
            get(account_idx),
            get(operation_idx),
            get(coin_idx),
            get(change_idx),
            remark_idx.map(get).filter(|s| !s.is_empty()),
        ));
    }
    Ok(rows)
}
