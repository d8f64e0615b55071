//! Aave V3 Pool — supply, withdraw, borrow, repay. Function-selector
//! dispatch on the Pool contract, transfer consumption from context.

use crate::context::{TransactionContext, TransferFilter};
use crate::extractor::TransferKind;
use crate::model::EntryType;
use crate::parsers::handlers::{borrow_splits, deposit_splits, repay_splits, withdrawal_splits};
use crate::parsers::{chain_of, from_addr, make_gas_splits, selector_of, to_addr, ParseResult, Parser};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

const SUPPLY_SELECTOR: &str = "0x617ba037";
const WITHDRAW_SELECTOR: &str = "0x69328dec";
const BORROW_SELECTOR: &str = "0xa415bcad";
const REPAY_SELECTOR: &str = "0x573ade81";
const REPAY_WITH_ATOKENS: &str = "0x2dad97d4";

pub static AAVE_V3_POOL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", "0x87870bca3f3fd6335c3f4ce8392d69350b4fa4e2"),
        ("arbitrum", "0x794a61358d6845594f94dc1db02a252b5b4814ad"),
        ("optimism", "0x794a61358d6845594f94dc1db02a252b5b4814ad"),
        ("polygon", "0x794a61358d6845594f94dc1db02a252b5b4814ad"),
        ("base", "0xa238dd80c259a72e81d7e4664a9801593f98d1c5"),
        ("avalanche", "0x794a61358d6845594f94dc1db02a252b5b4814ad"),
    ])
});

const PROTOCOL: &str = "aave_v3";

fn qty_of(value_units: u128, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(value_units as i128, decimals)
}

pub struct AaveV3Parser;

impl Parser for AaveV3Parser {
    fn name(&self) -> &'static str {
        "AaveV3Parser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        AAVE_V3_POOL.get(chain.as_str()).map(|p| *p == to).unwrap_or(false)
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let wallet = from_addr(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let (added, entry_type) = if selector == SUPPLY_SELECTOR {
            (handle_supply(ctx, &wallet), EntryType::Deposit)
        } else if selector == WITHDRAW_SELECTOR {
            (handle_withdraw(ctx, &wallet), EntryType::Withdrawal)
        } else if selector == BORROW_SELECTOR {
            (handle_borrow(ctx, &wallet), EntryType::Borrow)
        } else if selector == REPAY_SELECTOR || selector == REPAY_WITH_ATOKENS {
            (handle_repay(ctx, &wallet), EntryType::Repay)
        } else {
            return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
        };

        splits.extend(added);
        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}

fn handle_supply(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let pool_transfer = ctx.pop_transfer(TransferFilter {
        from: Some(wallet),
        kind: Some(TransferKind::Erc20),
        ..Default::default()
    });
    let Some(transfer) = pool_transfer else { return Vec::new() };
    let qty = qty_of(transfer.value_units, transfer.decimals);
    ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
    deposit_splits(&transfer.symbol, qty, PROTOCOL)
}

fn handle_withdraw(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(transfer) = ctx.pop_transfer(TransferFilter {
        to: Some(wallet),
        kind: Some(TransferKind::Erc20),
        ..Default::default()
    }) else { return Vec::new() };
    let qty = qty_of(transfer.value_units, transfer.decimals);
    ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
    withdrawal_splits(&transfer.symbol, qty, PROTOCOL)
}

fn handle_borrow(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(transfer) = ctx.pop_transfer(TransferFilter {
        to: Some(wallet),
        kind: Some(TransferKind::Erc20),
        ..Default::default()
    }) else { return Vec::new() };
    let qty = qty_of(transfer.value_units, transfer.decimals);
    ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
    borrow_splits(&transfer.symbol, qty, PROTOCOL)
}

fn handle_repay(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(transfer) = ctx.pop_transfer(TransferFilter {
        from: Some(wallet),
        kind: Some(TransferKind::Erc20),
        ..Default::default()
    }) else { return Vec::new() };
    let qty = qty_of(transfer.value_units, transfer.decimals);
    ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
    repay_splits(&transfer.symbol, qty, PROTOCOL)
}
