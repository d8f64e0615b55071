//! Binance CEX parsers operating on API-shaped trade/deposit/withdrawal
//! records (as opposed to the CSV transaction-history import, see `csv`).

use crate::context::TransactionContext;
use crate::model::EntryType;
use crate::parsers::{AccountRef, ParseResult, Parser, ParsedSplit};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const KNOWN_QUOTES: &[&str] = &["USDT", "BUSD", "USDC", "BTC", "ETH", "BNB", "TUSD", "DAI", "FDUSD", "EUR", "TRY", "GBP"];

/// Split a Binance trading pair like "BTCUSDT" into ("BTC", "USDT").
fn parse_pair(symbol: &str) -> (String, String) {
    for quote in KNOWN_QUOTES {
        if symbol.ends_with(quote) && symbol.len() > quote.len() {
            let base = &symbol[..symbol.len() - quote.len()];
            return (base.to_string(), quote.to_string());
        }
    }
    if symbol.len() > 3 {
        let (base, quote) = symbol.split_at(symbol.len() - 3);
        (base.to_string(), quote.to_string())
    } else {
        (symbol.to_string(), "UNKNOWN".to_string())
    }
}

fn decimal_field(tx_data: &Value, field: &str) -> Decimal {
    match tx_data.get(field) {
        Some(Value::String(s)) => Decimal::from_str(s).unwrap_or(Decimal::ZERO),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn string_field<'a>(tx_data: &'a Value, field: &str, default: &'a str) -> String {
    tx_data.get(field).and_then(Value::as_str).unwrap_or(default).to_string()
}

pub struct BinanceTradeParser;

impl Parser for BinanceTradeParser {
    fn name(&self) -> &'static str {
        "BinanceTradeParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        tx_data.get("chain").and_then(Value::as_str) == Some("binance")
            && tx_data.get("qty").is_some()
            && tx_data.get("quoteQty").is_some()
    }

    fn parse(&self, tx_data: &Value, _ctx: &mut TransactionContext) -> ParseResult {
        let symbol_pair = string_field(tx_data, "symbol", "");
        let (base_asset, quote_asset) = parse_pair(&symbol_pair);
        let is_buyer = tx_data
            .get("isBuyer")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| string_field(tx_data, "side", "").eq_ignore_ascii_case("buy"));

        let qty = decimal_field(tx_data, "qty");
        let quote_qty = decimal_field(tx_data, "quoteQty");
        let commission = decimal_field(tx_data, "commission");
        let commission_asset = string_field(tx_data, "commissionAsset", "");

        let mut splits = if is_buyer {
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &base_asset, qty),
                ParsedSplit::new(AccountRef::CexAsset, &quote_asset, -quote_qty),
            ]
        } else {
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &base_asset, -qty),
                ParsedSplit::new(AccountRef::CexAsset, &quote_asset, quote_qty),
            ]
        };

        if commission > Decimal::ZERO && !commission_asset.is_empty() {
            splits.push(ParsedSplit::new(AccountRef::CexAsset, &commission_asset, -commission));
            splits.push(ParsedSplit::new(AccountRef::WalletExpense, &commission_asset, commission));
        }

        ParseResult { splits, entry_type: EntryType::Swap, parser_name: self.name() }
    }
}

pub struct BinanceDepositParser;

impl Parser for BinanceDepositParser {
    fn name(&self) -> &'static str {
        "BinanceDepositParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        tx_data.get("chain").and_then(Value::as_str) == Some("binance")
            && (tx_data.get("depositOrderId").is_some() || (tx_data.get("txId").is_some() && tx_data.get("insertTime").is_some()))
    }

    fn parse(&self, tx_data: &Value, _ctx: &mut TransactionContext) -> ParseResult {
        let coin = string_field(tx_data, "coin", "");
        let coin = if coin.is_empty() { string_field(tx_data, "asset", "UNKNOWN") } else { coin };
        let amount = decimal_field(tx_data, "amount");
        let ext_address = string_field(tx_data, "address", "external");

        let splits = vec![
            ParsedSplit::new(AccountRef::CexAsset, &coin, amount),
            ParsedSplit::new(AccountRef::ExternalTransfer { ext_address }, &coin, -amount),
        ];

        ParseResult { splits, entry_type: EntryType::Deposit, parser_name: self.name() }
    }
}

pub struct BinanceWithdrawalParser;

impl Parser for BinanceWithdrawalParser {
    fn name(&self) -> &'static str {
        "BinanceWithdrawalParser"
    }

    fn can_parse(&self, tx_data: &Value, _ctx: &TransactionContext) -> bool {
        tx_data.get("chain").and_then(Value::as_str) == Some("binance")
            && (tx_data.get("withdrawOrderId").is_some() || (tx_data.get("applyTime").is_some() && tx_data.get("transactionFee").is_some()))
    }

    fn parse(&self, tx_data: &Value, _ctx: &mut TransactionContext) -> ParseResult {
        let coin = string_field(tx_data, "coin", "");
        let coin = if coin.is_empty() { string_field(tx_data, "asset", "UNKNOWN") } else { coin };
        let amount = decimal_field(tx_data, "amount");
        let fee = decimal_field(tx_data, "transactionFee");
        let net_amount = amount - fee;
        let ext_address = string_field(tx_data, "address", "external");

        let mut splits = vec![
            ParsedSplit::new(AccountRef::CexAsset, &coin, -amount),
            ParsedSplit::new(AccountRef::ExternalTransfer { ext_address }, &coin, net_amount),
        ];

        if fee > Decimal::ZERO {
            splits.push(ParsedSplit::new(AccountRef::WalletExpense, &coin, fee));
        }

        ParseResult { splits, entry_type: EntryType::Withdrawal, parser_name: self.name() }
    }
}
