//! Reusable split-pair builders for DeFi accounting patterns. Every
//! function returns a balanced pair (sum = 0 per symbol).

use super::{AccountRef, ParsedSplit};
use rust_decimal::Decimal;

pub fn deposit_splits(symbol: &str, qty: Decimal, protocol: &str) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, symbol, -qty),
        ParsedSplit::new(AccountRef::ProtocolAsset { protocol: protocol.to_string() }, symbol, qty),
    ]
}

pub fn withdrawal_splits(symbol: &str, qty: Decimal, protocol: &str) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::ProtocolAsset { protocol: protocol.to_string() }, symbol, -qty),
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, symbol, qty),
    ]
}

pub fn borrow_splits(symbol: &str, qty: Decimal, protocol: &str) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::ProtocolDebt { protocol: protocol.to_string() }, symbol, -qty),
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, symbol, qty),
    ]
}

pub fn repay_splits(symbol: &str, qty: Decimal, protocol: &str) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, symbol, -qty),
        ParsedSplit::new(AccountRef::ProtocolDebt { protocol: protocol.to_string() }, symbol, qty),
    ]
}

pub fn yield_splits(symbol: &str, qty: Decimal, tag: &str) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::WalletIncome { tag: tag.to_string() }, symbol, -qty),
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, symbol, qty),
    ]
}

/// Send token A, receive token B (e.g. stETH -> wstETH).
pub fn wrap_splits(from_symbol: &str, from_qty: Decimal, to_symbol: &str, to_qty: Decimal) -> Vec<ParsedSplit> {
    vec![
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, from_symbol, -from_qty),
        ParsedSplit::new(AccountRef::Erc20Token { token_address: String::new() }, to_symbol, to_qty),
    ]
}

pub fn unwrap_splits(from_symbol: &str, from_qty: Decimal, to_symbol: &str, to_qty: Decimal) -> Vec<ParsedSplit> {
    wrap_splits(from_symbol, from_qty, to_symbol, to_qty)
}
