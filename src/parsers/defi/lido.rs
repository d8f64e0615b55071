//! Lido — ETH staking (submit -> stETH) and stETH/wstETH wrapping.

use crate::context::{TransactionContext, TransferFilter};
use crate::extractor::TransferKind;
use crate::model::EntryType;
use crate::parsers::handlers::{unwrap_splits, wrap_splits};
use crate::parsers::{chain_of, from_addr, make_gas_splits, native_symbol, selector_of, to_addr, AccountRef, ParseResult, Parser, ParsedSplit};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

pub static LIDO_STETH: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("ethereum", "0xae7ab96520de3a18e5e111b5eaab095312d7fe84")]));

pub static LIDO_WSTETH: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("ethereum", "0x7f39c581f595b53c5cb19bd0b3f8da6c935e2ca0")]));

const SUBMIT_SELECTOR: &str = "0xa1903eab";
const WRAP_SELECTOR: &str = "0xea598cb0";
const UNWRAP_SELECTOR: &str = "0xde0e9a3e";

const PROTOCOL: &str = "lido";

fn qty_of(value_units: u128, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(value_units as i128, decimals)
}

pub struct LidoParser;

impl Parser for LidoParser {
    fn name(&self) -> &'static str {
        "LidoParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        LIDO_STETH.get(chain.as_str()).map(|p| *p == to).unwrap_or(false)
            || LIDO_WSTETH.get(chain.as_str()).map(|p| *p == to).unwrap_or(false)
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let to = to_addr(tx_data);
        let wallet = from_addr(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let is_wsteth = LIDO_WSTETH.get(chain.as_str()).map(|p| *p == to).unwrap_or(false);

        let entry_type = if selector == SUBMIT_SELECTOR {
            splits.extend(handle_submit(ctx, tx_data, &chain, &wallet));
            EntryType::Swap
        } else if is_wsteth && selector == WRAP_SELECTOR {
            splits.extend(handle_wrap(ctx, &wallet));
            EntryType::Swap
        } else if is_wsteth && selector == UNWRAP_SELECTOR {
            splits.extend(handle_unwrap(ctx, &wallet));
            EntryType::Swap
        } else {
            return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}

fn tx_value_units(tx_data: &Value) -> u128 {
    match tx_data.get("value") {
        Some(Value::String(s)) => s.strip_prefix("0x").and_then(|h| u128::from_str_radix(h, 16).ok()).or_else(|| s.parse().ok()).unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().map(u128::from).unwrap_or(0),
        _ => 0,
    }
}

fn handle_submit(ctx: &mut TransactionContext, tx_data: &Value, chain: &str, wallet: &str) -> Vec<ParsedSplit> {
    let eth_units = tx_value_units(tx_data);
    if eth_units == 0 {
        return Vec::new();
    }
    let eth_qty = qty_of(eth_units, 18);
    let nat_sym = native_symbol(chain);

    let Some(steth) = ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    let steth_qty = qty_of(steth.value_units, steth.decimals);

    vec![
        ParsedSplit::new(AccountRef::NativeAsset, nat_sym, -eth_qty),
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, &steth.symbol, steth_qty),
    ]
}

fn handle_wrap(ctx: &mut TransactionContext, wallet: &str) -> Vec<ParsedSplit> {
    let Some(steth) = ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    let Some(wsteth) = ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    wrap_splits(&steth.symbol, qty_of(steth.value_units, steth.decimals), &wsteth.symbol, qty_of(wsteth.value_units, wsteth.decimals))
}

fn handle_unwrap(ctx: &mut TransactionContext, wallet: &str) -> Vec<ParsedSplit> {
    let Some(wsteth) = ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    let Some(steth) = ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    unwrap_splits(&wsteth.symbol, qty_of(wsteth.value_units, wsteth.decimals), &steth.symbol, qty_of(steth.value_units, steth.decimals))
}
