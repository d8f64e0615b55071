//! `TaxEngine` — FIFO capital gains plus Vietnam transfer tax (spec §4.6).

mod fifo;
mod transfer_tax;

pub use fifo::{fifo_match, Trade, TradeSide};
pub use transfer_tax::{calculate_transfer_tax, TAX_RATE};

use crate::errors::LedgerResult;
use crate::logger::{self, LogTag};
use crate::model::{AccountSubtype, ClosedLot, EntryType, OpenLot, TaxableTransferRecord};
use crate::storage::{AccountRepo, JournalRepo, LotRepo};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// The VND/USD rate and the VND exemption threshold are deliberately
/// kept out of the global `config` module (spec §9): they're
/// constructed once per run and threaded explicitly into the engine.
#[derive(Debug, Clone, Copy)]
pub struct TaxConfig {
    pub usd_vnd_rate: Decimal,
    pub exemption_threshold_vnd: Decimal,
}

impl TaxConfig {
    pub fn new(usd_vnd_rate: Decimal, exemption_threshold_vnd: Decimal) -> Self {
        Self { usd_vnd_rate, exemption_threshold_vnd }
    }
}

/// A journal split flattened with its account's symbol/subtype and
/// its entry's timestamp/type — the shape `trades_from_splits` and
/// `calculate_transfer_tax` both consume (spec §4.6 "Inputs").
#[derive(Debug, Clone)]
pub struct SplitWithAccount {
    pub symbol: String,
    pub account_subtype: AccountSubtype,
    pub quantity: Decimal,
    pub value_usd: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub journal_entry_id: Uuid,
    pub entry_type: EntryType,
}

#[derive(Debug, Clone)]
pub struct TaxSummary {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_realized_gain_usd: Decimal,
    pub total_transfer_tax_vnd: Decimal,
    pub total_exempt_vnd: Decimal,
    pub closed_lots: Vec<ClosedLot>,
    pub open_lots: Vec<OpenLot>,
    pub taxable_transfers: Vec<TaxableTransferRecord>,
}

pub struct TaxEngine<'a, S: AccountRepo + JournalRepo + LotRepo> {
    store: &'a S,
    config: TaxConfig,
}

impl<'a, S: AccountRepo + JournalRepo + LotRepo> TaxEngine<'a, S> {
    pub fn new(store: &'a S, config: TaxConfig) -> Self {
        Self { store, config }
    }

    /// Runs the full calculation for `entity_id` over `[start, end]`
    /// and persists the result (delete-then-insert, spec §4.6 step 4).
    pub fn calculate(&self, entity_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<TaxSummary> {
        let splits = self.load_splits(entity_id, start, end)?;

        let symbols: BTreeSet<&str> = splits.iter().map(|s| s.symbol.as_str()).collect();
        let mut all_closed = Vec::new();
        let mut all_open = Vec::new();

        for symbol in symbols {
            let trades = trades_from_splits(&splits, symbol);
            if trades.is_empty() {
                continue;
            }
            let (closed, open) = fifo_match(entity_id, symbol, &trades);
            all_closed.extend(closed);
            all_open.extend(open);
        }

        let taxable_transfers =
            calculate_transfer_tax(entity_id, &splits, self.config.usd_vnd_rate, self.config.exemption_threshold_vnd);

        let total_gain: Decimal = all_closed.iter().map(|cl| cl.gain_usd).sum();
        let total_tax: Decimal = taxable_transfers.iter().filter(|t| t.exemption_reason.is_none()).map(|t| t.tax_vnd).sum();
        let total_exempt: Decimal = taxable_transfers.iter().filter(|t| t.exemption_reason.is_some()).map(|t| t.value_vnd).sum();

        self.store.clear_lots_for_entity(entity_id)?;
        self.store.insert_closed_lots(&all_closed)?;
        self.store.insert_open_lots(&all_open)?;
        self.store.insert_taxable_transfers(&taxable_transfers)?;

        logger::info(
            LogTag::TaxEngine,
            &format!("entity {entity_id}: {} closed lots, {} open lots, {} taxable transfers", all_closed.len(), all_open.len(), taxable_transfers.len()),
        );

        Ok(TaxSummary {
            period_start: start,
            period_end: end,
            total_realized_gain_usd: total_gain,
            total_transfer_tax_vnd: total_tax,
            total_exempt_vnd: total_exempt,
            closed_lots: all_closed,
            open_lots: all_open,
            taxable_transfers,
        })
    }

    fn load_splits(&self, entity_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Vec<SplitWithAccount>> {
        let entries = self.store.list_entries_for_entity_in_range(entity_id, start, end)?;

        let mut account_cache: HashMap<Uuid, crate::model::Account> = HashMap::new();
        let mut out = Vec::new();

        for entry in entries {
            for split in entry.splits {
                let account = match account_cache.get(&split.account_id) {
                    Some(a) => a.clone(),
                    None => {
                        let Some(a) = self.store.get_account(split.account_id)? else { continue };
                        account_cache.insert(split.account_id, a.clone());
                        a
                    }
                };

                out.push(SplitWithAccount {
                    symbol: account.symbol,
                    account_subtype: account.subtype,
                    quantity: split.quantity,
                    value_usd: split.value_usd,
                    timestamp: entry.timestamp,
                    journal_entry_id: entry.id,
                    entry_type: entry.entry_type,
                });
            }
        }

        Ok(out)
    }
}

/// Builds `Trade`s for one symbol from the flattened split list (spec
/// §4.6 step 1), sorted ascending by timestamp.
fn trades_from_splits(splits: &[SplitWithAccount], symbol: &str) -> Vec<Trade> {
    let asset_subtype = |s: AccountSubtype| matches!(s, AccountSubtype::NativeAsset | AccountSubtype::Erc20Token | AccountSubtype::ProtocolAsset);

    let mut trades: Vec<Trade> = splits
        .iter()
        .filter(|s| s.symbol == symbol && asset_subtype(s.account_subtype) && s.quantity != Decimal::ZERO)
        .map(|s| {
            let abs_qty = s.quantity.abs();
            let value_usd = s.value_usd.map(|v| v.abs()).unwrap_or(Decimal::ZERO);
            let price_usd = if abs_qty > Decimal::ZERO { value_usd / abs_qty } else { Decimal::ZERO };

            Trade {
                side: if s.quantity > Decimal::ZERO { TradeSide::Buy } else { TradeSide::Sell },
                quantity: abs_qty,
                price_usd,
                timestamp: s.timestamp,
                entry_id: s.journal_entry_id,
            }
        })
        .collect();

    trades.sort_by_key(|t| t.timestamp);
    trades
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(symbol: &str, subtype: AccountSubtype, quantity: Decimal, value_usd: Decimal, ts: DateTime<Utc>) -> SplitWithAccount {
        SplitWithAccount {
            symbol: symbol.to_string(),
            account_subtype: subtype,
            quantity,
            value_usd: Some(value_usd),
            timestamp: ts,
            journal_entry_id: Uuid::new_v4(),
            entry_type: EntryType::Transfer,
        }
    }

    #[test]
    fn trades_from_splits_skips_other_symbols_and_non_asset_subtypes() {
        let now = Utc::now();
        let splits = vec![
            split("ETH", AccountSubtype::NativeAsset, Decimal::new(1, 0), Decimal::new(100, 0), now),
            split("BTC", AccountSubtype::NativeAsset, Decimal::new(1, 0), Decimal::new(100, 0), now),
            split("ETH", AccountSubtype::WalletExpense, Decimal::new(-1, 0), Decimal::new(5, 0), now),
        ];
        let trades = trades_from_splits(&splits, "ETH");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
    }
}
