//! `Bookkeeper` — TX -> Parser -> AccountMapper -> JournalEntry
//! (spec §4.3, §4.4). Owns the commit-on-first-match parser semantics:
//! once a parser's `can_parse` returns true it is never skipped in
//! favor of a later candidate, even if its `parse` then yields nothing.

use crate::account_mapper::AccountMapper;
use crate::context::TransactionContext;
use crate::errors::LedgerResult;
use crate::extractor::extract_all_transfers;
use crate::logger::{self, LogTag};
use crate::model::{Account, JournalEntry, JournalSplit, ParseErrorRecord, Transaction, TransactionStatus, Wallet};
use crate::parsers::{balance_by_symbol, AccountRef, ParseResult, ParsedSplit, ParserRegistry};
use crate::storage::{AccountRepo, JournalRepo, TransactionRepo};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

pub trait PriceOracle {
    /// Returns `(value_usd, value_vnd)` for `quantity` units of `symbol`
    /// priced at `timestamp_unix`. `None`/`None` is a legitimate answer
    /// (no price service configured, or lookup failed) — pricing never
    /// blocks journaling (spec §9).
    fn price_split(&self, symbol: &str, quantity: Decimal, timestamp_unix: i64) -> (Option<Decimal>, Option<Decimal>);
}

pub struct Bookkeeper<'a, S: AccountRepo + TransactionRepo + JournalRepo> {
    store: &'a S,
    registry: &'a ParserRegistry,
    mapper: AccountMapper<'a, S>,
    price_oracle: Option<&'a dyn PriceOracle>,
}

impl<'a, S: AccountRepo + TransactionRepo + JournalRepo> Bookkeeper<'a, S> {
    pub fn new(store: &'a S, registry: &'a ParserRegistry, price_oracle: Option<&'a dyn PriceOracle>) -> Self {
        Self { store, registry, mapper: AccountMapper::new(store), price_oracle }
    }

    /// Parses a single transaction into a balanced journal entry.
    /// Returns `Ok(None)` when the transaction could not be parsed or
    /// didn't balance — the failure itself is recorded as a
    /// `ParseErrorRecord`, not surfaced as an error.
    pub fn process_transaction(&self, tx: &mut Transaction, wallet: &Wallet, entity_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        let chain = tx.chain.clone();
        let mut tx_data = tx.raw_data.clone();
        if let Some(obj) = tx_data.as_object_mut() {
            obj.insert("chain".to_string(), serde_json::Value::String(chain.clone()));
        }

        let transfers = extract_all_transfers(&chain, &tx_data);
        let wallet_addresses = wallet.owned_addresses();
        let mut context = TransactionContext::new(transfers, wallet_addresses, Vec::new());

        let to_addr = tx_data.get("to").and_then(serde_json::Value::as_str);
        let candidates = self.registry.get(&chain, to_addr);

        let mut result: Option<ParseResult> = None;
        for parser in &candidates {
            if parser.can_parse(&tx_data, &context) {
                result = Some(parser.parse(&tx_data, &mut context));
                break;
            }
        }

        let Some(result) = result.filter(|r| !r.splits.is_empty()) else {
            logger::warning(LogTag::Parser, &format!("no parser produced splits for tx {}", tx.tx_hash));
            self.record_error(tx, "UNKNOWN_TRANSACTION_INPUT_ERROR", "No parser produced splits for this transaction")?;
            tx.status = TransactionStatus::Error;
            tx.entry_type = None;
            return Ok(None);
        };

        if !result.entry_type.is_multi_symbol() && !balance_is_zero(&result.splits) {
            let summary = balance_summary(&result.splits);
            self.record_error(tx, "BALANCE_ERROR", &format!("Splits don't sum to zero: {summary}"))?;
            tx.status = TransactionStatus::Error;
            return Ok(None);
        }

        let description = format!("{}: {}...", result.parser_name, &tx.tx_hash[..tx.tx_hash.len().min(10)]);
        let entry = self.commit_entry(entity_id, wallet, result.entry_type, tx.timestamp, description, Some(tx.id), &result.splits)?;

        tx.status = TransactionStatus::Parsed;
        tx.entry_type = Some(result.entry_type);
        Ok(Some(entry))
    }

    /// Resolves accounts, prices, and persists a journal entry from an
    /// already-parsed split list. Shared by `process_transaction` and
    /// the CEX CSV importer, which has no per-row `Transaction` record
    /// to attach an entry to (`transaction_id` is `None` there).
    pub fn commit_entry(
        &self,
        entity_id: Uuid,
        wallet: &Wallet,
        entry_type: crate::model::EntryType,
        timestamp: chrono::DateTime<chrono::Utc>,
        description: String,
        transaction_id: Option<Uuid>,
        splits: &[ParsedSplit],
    ) -> LedgerResult<JournalEntry> {
        let mut entry = JournalEntry {
            id: Uuid::new_v4(),
            entity_id,
            transaction_id,
            entry_type,
            description,
            timestamp,
            splits: Vec::new(),
        };

        for ps in splits {
            let account = self.resolve_account(ps, wallet)?;
            let (value_usd, value_vnd) = self
                .price_oracle
                .map(|oracle| oracle.price_split(&ps.symbol, ps.quantity, timestamp.timestamp()))
                .unwrap_or((None, None));

            entry.splits.push(JournalSplit {
                id: Uuid::new_v4(),
                entry_id: entry.id,
                account_id: account.id,
                symbol: ps.symbol.clone(),
                quantity: ps.quantity,
                value_usd,
                value_vnd,
            });
        }

        self.store.insert_entry(&entry)?;
        Ok(entry)
    }

    /// Processes every `LOADED` transaction for a wallet, in block order.
    pub fn process_wallet(&self, mut txs: Vec<Transaction>, wallet: &Wallet, entity_id: Uuid) -> LedgerResult<WalletStats> {
        txs.sort_by_key(|t| t.block_number);
        let mut stats = WalletStats { total: txs.len(), ..Default::default() };

        for mut tx in txs {
            match self.process_transaction(&mut tx, wallet, entity_id) {
                Ok(Some(_)) => {
                    stats.processed += 1;
                    self.store.update_transaction_status(tx.id, tx.status, tx.entry_type)?;
                }
                Ok(None) => {
                    stats.errors += 1;
                    self.store.update_transaction_status(tx.id, tx.status, tx.entry_type)?;
                }
                Err(e) => {
                    logger::error(LogTag::Parser, &format!("tx {} failed: {e}", tx.tx_hash));
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    fn resolve_account(&self, ps: &ParsedSplit, wallet: &Wallet) -> LedgerResult<Account> {
        match &ps.account_ref {
            AccountRef::NativeAsset => self.mapper.native_asset(wallet),
            AccountRef::Erc20Token { token_address } => self.mapper.erc20_token(wallet, token_address, &ps.symbol),
            AccountRef::CexAsset => self.mapper.cex_asset(wallet, &ps.symbol),
            AccountRef::WalletExpense => match wallet {
                Wallet::Cex(_) => self.mapper.cex_expense(wallet, &ps.symbol),
                Wallet::OnChain(_) => self.mapper.gas_expense(wallet),
            },
            AccountRef::ExternalTransfer { ext_address } => self.mapper.external_transfer(wallet, &ps.symbol, ext_address),
            AccountRef::ProtocolAsset { protocol } => self.mapper.protocol_asset(wallet, protocol, &ps.symbol),
            AccountRef::ProtocolDebt { protocol } => self.mapper.protocol_debt(wallet, protocol, &ps.symbol),
            AccountRef::WalletIncome { tag } => self.mapper.income(wallet, &ps.symbol, tag),
        }
    }

    fn record_error(&self, tx: &Transaction, error_kind: &str, message: &str) -> LedgerResult<()> {
        let record = ParseErrorRecord {
            id: Uuid::new_v4(),
            tx_id: Some(tx.id),
            wallet_id: Some(tx.wallet_id),
            error_kind: error_kind.to_string(),
            message: message.to_string(),
            diagnostic_blob: serde_json::json!({
                "tx_hash": tx.tx_hash,
                "chain": tx.chain,
            }),
            resolved: false,
        };
        self.store.insert_parse_error(&record)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WalletStats {
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
}

fn balance_is_zero(splits: &[ParsedSplit]) -> bool {
    balance_by_symbol(splits).values().all(|total| *total == Decimal::ZERO)
}

fn balance_summary(splits: &[ParsedSplit]) -> String {
    let totals: HashMap<String, Decimal> = balance_by_symbol(splits);
    totals
        .into_iter()
        .filter(|(_, total)| *total != Decimal::ZERO)
        .map(|(sym, total)| format!("{sym}={total}"))
        .collect::<Vec<_>>()
        .join(", ")
}
