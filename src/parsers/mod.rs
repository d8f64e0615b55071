//! Protocol parsers: TX + context -> balanced `ParsedSplit`s (spec §4.3).

pub mod binance;
mod defi;
mod gas;
mod generic_evm;
mod generic_swap;
mod handlers;
mod registry;

pub use gas::{calculate_gas_fee_decimal, make_gas_splits, native_symbol};
pub use generic_evm::GenericEvmParser;
pub use generic_swap::GenericSwapParser;
pub use registry::{build_default_registry, ParserRegistry};

use crate::context::TransactionContext;
use crate::model::EntryType;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

/// What a split maps to via the account mapper; carries the extra
/// keyword parameters the original Python passed as `account_params`.
#[derive(Debug, Clone)]
pub enum AccountRef {
    NativeAsset,
    Erc20Token { token_address: String },
    CexAsset,
    WalletExpense,
    ExternalTransfer { ext_address: String },
    ProtocolAsset { protocol: String },
    ProtocolDebt { protocol: String },
    WalletIncome { tag: String },
}

#[derive(Debug, Clone)]
pub struct ParsedSplit {
    pub account_ref: AccountRef,
    pub symbol: String,
    pub quantity: Decimal,
}

impl ParsedSplit {
    pub fn new(account_ref: AccountRef, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self { account_ref, symbol: symbol.into(), quantity }
    }
}

pub struct ParseResult {
    pub splits: Vec<ParsedSplit>,
    pub entry_type: EntryType,
    pub parser_name: &'static str,
}

/// Every parser implements this; the registry tries them in order and
/// commits to the first whose `can_parse` returns true (spec §4.3.1).
pub trait Parser {
    fn name(&self) -> &'static str;
    fn can_parse(&self, tx_data: &Value, ctx: &TransactionContext) -> bool;
    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult;
}

pub fn chain_of(tx_data: &Value) -> String {
    tx_data.get("chain").and_then(Value::as_str).unwrap_or("ethereum").to_string()
}

pub fn selector_of(tx_data: &Value) -> String {
    let input = tx_data.get("input").and_then(Value::as_str).unwrap_or("");
    if input.len() >= 10 {
        input[..10].to_lowercase()
    } else {
        String::new()
    }
}

pub fn from_addr(tx_data: &Value) -> String {
    tx_data.get("from").and_then(Value::as_str).unwrap_or("").to_lowercase()
}

pub fn to_addr(tx_data: &Value) -> String {
    tx_data.get("to").and_then(Value::as_str).unwrap_or("").to_lowercase()
}

/// Net-flow-to-splits: every wallet-owned address's nonzero per-symbol
/// flow becomes one split. Shared by the swap-shaped DEX parsers
/// (Uniswap V3, Curve, Pendle, PancakeSwap router paths).
pub fn net_flow_splits(ctx: &TransactionContext, chain: &str) -> Vec<ParsedSplit> {
    let nat_sym = native_symbol(chain);
    let mut splits = Vec::new();
    for (addr, flows) in ctx.net_flows() {
        if !ctx.is_wallet(&addr) {
            continue;
        }
        for (tok_symbol, qty) in flows {
            if qty == Decimal::ZERO {
                continue;
            }
            let account_ref = if tok_symbol == nat_sym {
                AccountRef::NativeAsset
            } else {
                AccountRef::Erc20Token { token_address: String::new() }
            };
            splits.push(ParsedSplit::new(account_ref, &tok_symbol, qty));
        }
    }
    splits
}

/// Sums quantities per symbol; used to validate balanced splits
/// outside the multi-symbol entry types (spec §3 invariant I2).
pub fn balance_by_symbol(splits: &[ParsedSplit]) -> HashMap<String, Decimal> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for s in splits {
        *totals.entry(s.symbol.clone()).or_insert(Decimal::ZERO) += s.quantity;
    }
    totals
}
