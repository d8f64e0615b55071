use super::{AccountRef, ParsedSplit};
use crate::context::{TransactionContext};
use rust_decimal::Decimal;
use serde_json::Value;

pub fn native_symbol(chain: &str) -> &'static str {
    crate::extractor::native_symbol(chain)
}

fn as_u128(v: &Value) -> u128 {
    match v {
        Value::String(s) => {
            if let Some(hex) = s.strip_prefix("0x") {
                u128::from_str_radix(hex, 16).unwrap_or(0)
            } else {
                s.parse().unwrap_or(0)
            }
        }
        Value::Number(n) => n.as_u64().map(u128::from).unwrap_or(0),
        _ => 0,
    }
}

/// gasUsed * gasPrice + l1Fee for EVM, `meta.fee` lamports for Solana.
pub fn calculate_gas_fee_units(tx_data: &Value, chain: &str) -> u128 {
    if chain == "solana" {
        return tx_data.pointer("/meta/fee").map(as_u128).unwrap_or(0);
    }
    let gas_used = tx_data.get("gasUsed").map(as_u128).unwrap_or(0);
    let gas_price = tx_data.get("gasPrice").map(as_u128).unwrap_or(0);
    let mut fee = gas_used.saturating_mul(gas_price);
    if let Some(l1_fee) = tx_data.get("l1Fee") {
        fee = fee.saturating_add(as_u128(l1_fee));
    }
    fee
}

pub fn calculate_gas_fee_decimal(tx_data: &Value, chain: &str) -> Decimal {
    let decimals = if chain == "solana" { 9 } else { 18 };
    let units = calculate_gas_fee_units(tx_data, chain);
    if units == 0 {
        return Decimal::ZERO;
    }
    Decimal::from_i128_with_scale(units as i128, decimals)
}

/// Gas-fee split pair, emitted only when the wallet itself sent the TX.
pub fn make_gas_splits(tx_data: &Value, chain: &str, ctx: &TransactionContext) -> Vec<ParsedSplit> {
    let from = super::from_addr(tx_data);
    if !ctx.is_wallet(&from) {
        return Vec::new();
    }
    let fee = calculate_gas_fee_decimal(tx_data, chain);
    if fee <= Decimal::ZERO {
        return Vec::new();
    }
    let symbol = native_symbol(chain);
    vec![
        ParsedSplit::new(AccountRef::NativeAsset, symbol, -fee),
        ParsedSplit::new(AccountRef::WalletExpense, symbol, fee),
    ]
}
