//! Solana JSON-RPC client plus the signature-cursor wallet loader
//! (spec §4.7.3).

use crate::config::with_config;
use crate::errors::{LedgerError, LedgerResult};
use crate::logger::{self, LogTag};
use crate::model::{SyncStatus, Transaction, TransactionStatus, Wallet};
use crate::rate_limiter::SOLANA_RPC_LIMITER;
use crate::storage::{TransactionRepo, WalletRepo};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashSet;

pub struct SolanaRpcClient {
    client: Client,
    rpc_url: String,
    max_retries: u32,
}

impl SolanaRpcClient {
    pub fn new(client: Client, rpc_url: String) -> Self {
        let max_retries = with_config(|c| c.loaders.solana_rpc_max_retries);
        Self { client, rpc_url, max_retries }
    }

    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let payload = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });

        let mut attempt = 0;
        loop {
            SOLANA_RPC_LIMITER.wait_for_request().await;
            let response = self
                .client
                .post(&self.rpc_url)
                .json(&payload)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(LedgerError::Http(e));
                    }
                    let wait = std::time::Duration::from_secs((2u64.pow(attempt) * 2).min(30));
                    tokio::time::sleep(wait).await;
                    continue;
                }
            };

            let data: Value = response.json().await?;
            if let Some(error) = data.get("error") {
                attempt += 1;
                if attempt >= self.max_retries {
                    let msg = error.get("message").and_then(Value::as_str).unwrap_or("unknown").to_string();
                    return Err(LedgerError::ExternalService { provider: "solana_rpc".to_string(), detail: msg });
                }
                let wait = std::time::Duration::from_secs((2u64.pow(attempt) * 2).min(30));
                logger::warning(LogTag::SolanaLoader, &format!("solana RPC error ({method}), attempt {attempt}, waiting {wait:?}"));
                tokio::time::sleep(wait).await;
                continue;
            }

            return Ok(data.get("result").cloned().unwrap_or(Value::Null));
        }
    }

    pub async fn get_signatures(&self, address: &str, before: Option<&str>, limit: u32) -> LedgerResult<Vec<Value>> {
        let mut opts = json!({ "limit": limit });
        if let Some(before) = before {
            opts["before"] = json!(before);
        }
        let result = self.call("getSignaturesForAddress", json!([address, opts])).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    pub async fn get_transaction(&self, signature: &str) -> LedgerResult<Option<Value>> {
        let opts = json!({ "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 });
        let result = self.call("getTransaction", json!([signature, opts])).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    pub async fn get_slot(&self) -> LedgerResult<u64> {
        let result = self.call("getSlot", json!([])).await?;
        Ok(result.as_u64().unwrap_or(0))
    }
}

fn pubkey_at(account_keys: &[Value], idx: usize) -> Option<String> {
    let key = account_keys.get(idx)?;
    match key {
        Value::Object(_) => key.get("pubkey").and_then(Value::as_str).map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn build_transaction(wallet_id: uuid::Uuid, address: &str, signature: &str, slot: u64, tx_data: &Value) -> Transaction {
    let block_time = tx_data.get("blockTime").and_then(Value::as_i64);
    let meta = tx_data.get("meta").cloned().unwrap_or(Value::Null);
    let account_keys = tx_data
        .get("transaction")
        .and_then(|t| t.get("message"))
        .and_then(|m| m.get("accountKeys"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let from_addr = pubkey_at(&account_keys, 0);
    let to_addr = pubkey_at(&account_keys, 1);

    let value_lamports = (|| {
        let pre = meta.get("preBalances")?.as_array()?;
        let post = meta.get("postBalances")?.as_array()?;
        for (i, key) in account_keys.iter().enumerate() {
            let pubkey = match key {
                Value::Object(_) => key.get("pubkey").and_then(Value::as_str).map(str::to_string),
                Value::String(s) => Some(s.clone()),
                _ => None,
            };
            if pubkey.as_deref() == Some(address) {
                let p = pre.get(i)?.as_i64()?;
                let q = post.get(i)?.as_i64()?;
                return Some((q - p).unsigned_abs());
            }
        }
        None
    })();

    let mut raw_data = tx_data.clone();
    if let Some(obj) = raw_data.as_object_mut() {
        obj.insert("signature".to_string(), json!(signature));
        obj.insert("slot".to_string(), json!(slot));
        obj.insert("from".to_string(), json!(from_addr));
        obj.insert("to".to_string(), json!(to_addr));
        obj.insert("value".to_string(), json!(value_lamports.unwrap_or(0)));
    }

    Transaction {
        id: uuid::Uuid::new_v4(),
        wallet_id,
        chain: "solana".to_string(),
        tx_hash: signature.to_string(),
        block_number: slot as i64,
        timestamp: block_time.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)).unwrap_or_else(chrono::Utc::now),
        raw_data,
        status: TransactionStatus::Loaded,
        entry_type: None,
    }
}

/// Loads new transactions for one Solana wallet, walking
/// `getSignaturesForAddress` newest-first until an already-ingested
/// signature or a short page is seen, then replays chronologically.
pub async fn load_wallet<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, rpc: &SolanaRpcClient) -> LedgerResult<usize> {
    wallet.set_sync_status(SyncStatus::Syncing);
    store.update_wallet(wallet)?;

    match do_load(store, wallet, rpc).await {
        Ok(count) => {
            wallet.set_sync_status(SyncStatus::Synced);
            store.update_wallet(wallet)?;
            logger::info(LogTag::SolanaLoader, &format!("loaded {count} new txs for wallet {}", wallet.id()));
            Ok(count)
        }
        Err(e) => {
            wallet.set_sync_status(SyncStatus::Error);
            let _ = store.update_wallet(wallet);
            logger::error(LogTag::SolanaLoader, &format!("failed to load wallet {}: {e}", wallet.id()));
            Err(e)
        }
    }
}

async fn do_load<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, rpc: &SolanaRpcClient) -> LedgerResult<usize> {
    let Wallet::OnChain(on_chain) = wallet else {
        return Err(LedgerError::Config("Solana loader requires an on-chain wallet".to_string()));
    };

    let existing_hashes: HashSet<String> = store
        .list_loaded_for_wallet(on_chain.id)?
        .into_iter()
        .map(|tx| tx.tx_hash)
        .collect();

    let page_size = with_config(|c| c.loaders.solana_signature_page_size);
    let mut all_sigs: Vec<Value> = Vec::new();
    let mut before: Option<String> = None;

    loop {
        let batch = rpc.get_signatures(&on_chain.address, before.as_deref(), page_size).await?;
        if batch.is_empty() {
            break;
        }

        let mut hit_existing = false;
        for sig_info in &batch {
            let Some(sig) = sig_info.get("signature").and_then(Value::as_str) else { continue };
            if existing_hashes.contains(sig) {
                hit_existing = true;
                break;
            }
            all_sigs.push(sig_info.clone());
        }

        let short_page = (batch.len() as u32) < page_size;
        before = batch.last().and_then(|s| s.get("signature")).and_then(Value::as_str).map(str::to_string);

        if hit_existing || short_page {
            break;
        }
    }

    if all_sigs.is_empty() {
        on_chain.last_block_loaded = rpc.get_slot().await? as i64;
        store.update_wallet(wallet)?;
        return Ok(0);
    }

    all_sigs.reverse();

    let mut inserted = 0;
    let mut max_slot = on_chain.last_block_loaded.max(0) as u64;

    for sig_info in &all_sigs {
        let signature = sig_info.get("signature").and_then(Value::as_str).unwrap_or_default().to_string();
        let slot = sig_info.get("slot").and_then(Value::as_u64).unwrap_or(0);
        max_slot = max_slot.max(slot);

        if sig_info.get("err").map(|e| !e.is_null()).unwrap_or(false) {
            continue;
        }

        let Some(tx_data) = rpc.get_transaction(&signature).await? else { continue };
        let tx = build_transaction(on_chain.id, &on_chain.address, &signature, slot, &tx_data);
        if store.insert_transaction_if_absent(&tx)? {
            inserted += 1;
        }
    }

    on_chain.last_block_loaded = max_slot as i64;
    store.update_wallet(wallet)?;
    Ok(inserted)
}
