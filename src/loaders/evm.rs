//! Etherscan-v2 unified client plus the EVM wallet loader (spec §4.7.1).

use super::range_splitter::fetch_range;
use crate::config::with_config;
use crate::errors::{LedgerError, LedgerResult};
use crate::logger::{self, LogTag};
use crate::model::{SyncStatus, Transaction, TransactionStatus, Wallet};
use crate::rate_limiter::{RateLimitedRequest, ETHERSCAN_LIMITER};
use crate::storage::{TransactionRepo, WalletRepo};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.etherscan.io/v2/api";
const REORG_SAFETY_MARGIN: i64 = 50;

fn chain_id(chain: &str) -> Option<u64> {
    Some(match chain {
        "ethereum" => 1,
        "arbitrum" => 42161,
        "optimism" => 10,
        "polygon" => 137,
        "base" => 8453,
        "bsc" => 56,
        "avalanche" => 43114,
        _ => return None,
    })
}

pub struct EtherscanClient {
    client: Client,
    api_key: String,
    chain: String,
    chain_id: u64,
    max_retries: u32,
}

impl EtherscanClient {
    pub fn new(client: Client, api_key: String, chain: &str) -> LedgerResult<Self> {
        let chain_id = chain_id(chain).ok_or_else(|| LedgerError::Config(format!("unsupported EVM chain: {chain}")))?;
        let max_retries = with_config(|c| c.loaders.etherscan_max_retries);
        Ok(Self { client, api_key, chain: chain.to_string(), chain_id, max_retries })
    }

    async fn call(&self, params: &[(&str, String)]) -> LedgerResult<Vec<Value>> {
        let mut attempt = 0;
        loop {
            let mut url = format!("{BASE_URL}?apikey={}&chainid={}", self.api_key, self.chain_id);
            for (k, v) in params {
                url.push_str(&format!("&{k}={v}"));
            }

            let response = self.client.get_with_rate_limit(&url, &ETHERSCAN_LIMITER).await?;
            let data: Value = response.json().await?;

            let status = data.get("status").and_then(Value::as_str);
            let message = data.get("message").and_then(Value::as_str).unwrap_or("");
            let result = data.get("result").cloned().unwrap_or(Value::Null);

            if message == "No transactions found" || (status == Some("0") && result.as_array().is_some_and(Vec::is_empty)) {
                return Ok(Vec::new());
            }

            let retriable = message == "NOTOK" || status.is_none();
            if retriable || status == Some("0") {
                attempt += 1;
                if attempt >= self.max_retries {
                    let detail = if let Value::String(s) = &result { s.clone() } else { message.to_string() };
                    return Err(LedgerError::ExternalService { provider: "etherscan".to_string(), detail });
                }
                let wait = std::time::Duration::from_secs(2u64.pow(attempt).min(10));
                logger::warning(LogTag::EvmLoader, &format!("etherscan retriable error, attempt {attempt}, waiting {wait:?}"));
                tokio::time::sleep(wait).await;
                continue;
            }

            return Ok(result.as_array().cloned().unwrap_or_default());
        }
    }

    async fn fetch_with_split(&self, action: &str, address: &str, from_block: u64, to_block: u64) -> LedgerResult<Vec<Value>> {
        let call = |from: u64, to: u64| async move {
            self.call(&[
                ("module", "account".to_string()),
                ("action", action.to_string()),
                ("address", address.to_string()),
                ("startblock", from.to_string()),
                ("endblock", to.to_string()),
                ("sort", "asc".to_string()),
            ])
            .await
        };
        fetch_range(from_block, to_block, &call).await
    }

    pub async fn get_transactions(&self, address: &str, from_block: u64, to_block: u64) -> LedgerResult<Vec<Value>> {
        self.fetch_with_split("txlist", address, from_block, to_block).await
    }

    pub async fn get_internal_transactions(&self, address: &str, from_block: u64, to_block: u64) -> LedgerResult<Vec<Value>> {
        self.fetch_with_split("txlistinternal", address, from_block, to_block).await
    }

    pub async fn get_erc20_transfers(&self, address: &str, from_block: u64, to_block: u64) -> LedgerResult<Vec<Value>> {
        self.fetch_with_split("tokentx", address, from_block, to_block).await
    }

    pub async fn get_latest_block(&self) -> LedgerResult<u64> {
        let url = format!("{BASE_URL}?module=proxy&action=eth_blockNumber&apikey={}&chainid={}", self.api_key, self.chain_id);
        let response = self.client.get_with_rate_limit(&url, &ETHERSCAN_LIMITER).await?;
        let data: Value = response.json().await?;
        let result = data.get("result").and_then(Value::as_str).unwrap_or("0x0");
        let block = if let Some(hex) = result.strip_prefix("0x") {
            u64::from_str_radix(hex, 16).unwrap_or(0)
        } else {
            result.parse().unwrap_or(0)
        };
        Ok(block)
    }
}

fn tx_hash_lower(tx: &Value) -> String {
    tx.get("hash").and_then(Value::as_str).unwrap_or("").to_lowercase()
}

/// Loads new transactions for one on-chain wallet, advancing
/// `last_block_loaded` on success. Stays `Syncing`/`Error` on failure
/// so the caller can retry later without losing prior progress.
pub async fn load_wallet<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, client: &EtherscanClient) -> LedgerResult<usize> {
    wallet.set_sync_status(SyncStatus::Syncing);
    store.update_wallet(wallet)?;

    match do_load(store, wallet, client).await {
        Ok(count) => {
            wallet.set_sync_status(SyncStatus::Synced);
            store.update_wallet(wallet)?;
            logger::info(LogTag::EvmLoader, &format!("loaded {count} new txs for wallet {}", wallet.id()));
            Ok(count)
        }
        Err(e) => {
            wallet.set_sync_status(SyncStatus::Error);
            let _ = store.update_wallet(wallet);
            logger::error(LogTag::EvmLoader, &format!("failed to load wallet {}: {e}", wallet.id()));
            Err(e)
        }
    }
}

async fn do_load<S: TransactionRepo + WalletRepo>(store: &S, wallet: &mut Wallet, client: &EtherscanClient) -> LedgerResult<usize> {
    let Wallet::OnChain(on_chain) = wallet else {
        return Err(LedgerError::Config("EVM loader requires an on-chain wallet".to_string()));
    };

    let from_block = on_chain.last_block_loaded.max(0) as u64;
    let tip = client.get_latest_block().await?;
    let to_block = tip.saturating_sub(REORG_SAFETY_MARGIN as u64).max(from_block);

    if from_block >= to_block {
        logger::info(LogTag::EvmLoader, &format!("no new blocks for wallet {} (from={from_block}, tip={tip})", on_chain.address));
        return Ok(0);
    }

    let raw_txs = client.get_transactions(&on_chain.address, from_block, to_block).await?;
    if raw_txs.is_empty() {
        on_chain.last_block_loaded = to_block as i64;
        store.update_wallet(wallet)?;
        return Ok(0);
    }

    let token_txs = client.get_erc20_transfers(&on_chain.address, from_block, to_block).await?;
    let mut token_by_hash: HashMap<String, Vec<Value>> = HashMap::new();
    for t in token_txs {
        token_by_hash.entry(tx_hash_lower(&t)).or_default().push(t);
    }

    let internal_txs = client.get_internal_transactions(&on_chain.address, from_block, to_block).await?;
    let mut internal_by_hash: HashMap<String, Vec<Value>> = HashMap::new();
    for t in internal_txs {
        internal_by_hash.entry(tx_hash_lower(&t)).or_default().push(t);
    }

    let mut inserted = 0;
    let mut max_block = from_block;

    for mut raw in raw_txs {
        let block_num = raw.get("blockNumber").and_then(Value::as_str).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        max_block = max_block.max(block_num);

        let Some(hash) = raw.get("hash").and_then(Value::as_str).map(str::to_string) else { continue };
        let hash_lower = hash.to_lowercase();

        if let Some(obj) = raw.as_object_mut() {
            obj.insert("token_transfers".to_string(), Value::Array(token_by_hash.remove(&hash_lower).unwrap_or_default()));
            obj.insert("internal_transfers".to_string(), Value::Array(internal_by_hash.remove(&hash_lower).unwrap_or_default()));
        }

        let timestamp = raw
            .get("timeStamp")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(chrono::Utc::now);

        let tx = Transaction {
            id: uuid::Uuid::new_v4(),
            wallet_id: on_chain.id,
            chain: on_chain.chain.clone(),
            tx_hash: hash,
            block_number: block_num as i64,
            timestamp,
            raw_data: raw,
            status: TransactionStatus::Loaded,
            entry_type: None,
        };

        if store.insert_transaction_if_absent(&tx)? {
            inserted += 1;
        }
    }

    on_chain.last_block_loaded = max_block as i64;
    store.update_wallet(wallet)?;
    Ok(inserted)
}
