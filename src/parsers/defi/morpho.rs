//! Morpho Blue singleton lending + MetaMorpho ERC-4626 vaults.

use crate::context::{TransactionContext, TransferFilter};
use crate::extractor::TransferKind;
use crate::model::EntryType;
use crate::parsers::handlers::{borrow_splits, deposit_splits, repay_splits, withdrawal_splits};
use crate::parsers::{chain_of, from_addr, make_gas_splits, selector_of, to_addr, ParseResult, Parser};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

pub static MORPHO_BLUE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", "0xbbbbbbbbbb9cc5e90e3b3af64bdaf62c37eeffcb"),
        ("base", "0xbbbbbbbbbb9cc5e90e3b3af64bdaf62c37eeffcb"),
    ])
});

pub static METAMORPHO_VAULTS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("ethereum", vec![
            "0x78fc2c2ed1a4cdb5402365934ae5648adad094d0",
            "0xa0e430870c4604ccfc7b38ca7845b1ff653d0ff1",
            "0x38989bba00bdf8181f4082995b3deae96163ac5d",
            "0xd63070114470f685b75b74d60eec7c1113d33a3d",
            "0x4881ef0bf6d2365d3dd6499ccd7532bcdbce0658",
            "0xbeef01735c132ada46aa9aa4c54623caa92a64cb",
            "0xbeef02e5e13584ab96848af90261f0c8ee04722a",
        ]),
        ("base", vec!["0xc1256ae5ff1cf2719d4937adb3bbcccab2e00a2c"]),
    ])
});

const SUPPLY_SELECTOR: &str = "0x0c0a769b";
const WITHDRAW_SELECTOR: &str = "0x5c2bea49";
const BORROW_SELECTOR: &str = "0x50d8cd4b";
const REPAY_SELECTOR: &str = "0x20b76e81";
const SUPPLY_COLLATERAL_SELECTOR: &str = "0x238d6579";
const WITHDRAW_COLLATERAL_SELECTOR: &str = "0x8720316d";

const VAULT_DEPOSIT_SELECTOR: &str = "0x6e553f65";
const VAULT_MINT_SELECTOR: &str = "0x94bf804d";
const VAULT_WITHDRAW_SELECTOR: &str = "0xb460af94";
const VAULT_REDEEM_SELECTOR: &str = "0xba087652";

const PROTOCOL: &str = "morpho";

fn qty_of(value_units: u128, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(value_units as i128, decimals)
}

fn is_metamorpho_vault(chain: &str, address: &str) -> bool {
    METAMORPHO_VAULTS.get(chain).map(|v| v.contains(&address)).unwrap_or(false)
}

pub struct MorphoBlueParser;

impl Parser for MorphoBlueParser {
    fn name(&self) -> &'static str {
        "MorphoBlueParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        let to = to_addr(tx_data);
        MORPHO_BLUE.get(chain.as_str()).map(|p| *p == to).unwrap_or(false)
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let wallet = from_addr(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let entry_type = if selector == SUPPLY_SELECTOR || selector == SUPPLY_COLLATERAL_SELECTOR {
            splits.extend(handle_supply(ctx, &wallet));
            EntryType::Deposit
        } else if selector == WITHDRAW_SELECTOR || selector == WITHDRAW_COLLATERAL_SELECTOR {
            splits.extend(handle_withdraw(ctx, &wallet));
            EntryType::Withdrawal
        } else if selector == BORROW_SELECTOR {
            splits.extend(handle_borrow(ctx, &wallet));
            EntryType::Borrow
        } else if selector == REPAY_SELECTOR {
            splits.extend(handle_repay(ctx, &wallet));
            EntryType::Repay
        } else {
            return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}

fn handle_supply(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(t) = ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    deposit_splits(&t.symbol, qty_of(t.value_units, t.decimals), PROTOCOL)
}

fn handle_withdraw(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(t) = ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    withdrawal_splits(&t.symbol, qty_of(t.value_units, t.decimals), PROTOCOL)
}

fn handle_borrow(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(t) = ctx.pop_transfer(TransferFilter { to: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    borrow_splits(&t.symbol, qty_of(t.value_units, t.decimals), PROTOCOL)
}

fn handle_repay(ctx: &mut TransactionContext, wallet: &str) -> Vec<crate::parsers::ParsedSplit> {
    let Some(t) = ctx.pop_transfer(TransferFilter { from: Some(wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
        return Vec::new();
    };
    repay_splits(&t.symbol, qty_of(t.value_units, t.decimals), PROTOCOL)
}

pub struct MetaMorphoVaultParser;

impl Parser for MetaMorphoVaultParser {
    fn name(&self) -> &'static str {
        "MetaMorphoVaultParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        let chain = chain_of(tx_data);
        is_metamorpho_vault(&chain, &to_addr(tx_data))
    }

    fn parse(&self, tx_data: &Value, ctx: &mut TransactionContext) -> ParseResult {
        let chain = chain_of(tx_data);
        let selector = selector_of(tx_data);
        let wallet = from_addr(tx_data);
        let vault = to_addr(tx_data);
        let mut splits = make_gas_splits(tx_data, &chain, ctx);

        let entry_type = if selector == VAULT_DEPOSIT_SELECTOR || selector == VAULT_MINT_SELECTOR {
            let Some(t) = ctx
                .pop_transfer(TransferFilter { from: Some(&wallet), to: Some(&vault), kind: Some(TransferKind::Erc20), ..Default::default() })
                .or_else(|| ctx.pop_transfer(TransferFilter { from: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() }))
            else {
                return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
            };
            let qty = qty_of(t.value_units, t.decimals);
            ctx.pop_transfer(TransferFilter { to: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
            splits.extend(deposit_splits(&t.symbol, qty, PROTOCOL));
            EntryType::Deposit
        } else if selector == VAULT_WITHDRAW_SELECTOR || selector == VAULT_REDEEM_SELECTOR {
            let Some(t) = ctx.pop_transfer(TransferFilter { to: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() }) else {
                return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
            };
            let qty = qty_of(t.value_units, t.decimals);
            ctx.pop_transfer(TransferFilter { from: Some(&wallet), kind: Some(TransferKind::Erc20), ..Default::default() });
            splits.extend(withdrawal_splits(&t.symbol, qty, PROTOCOL));
            EntryType::Withdrawal
        } else {
            return ParseResult { splits: Vec::new(), entry_type: EntryType::Unknown, parser_name: self.name() };
        };

        ParseResult { splits, entry_type, parser_name: self.name() }
    }
}
