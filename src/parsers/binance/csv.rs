//! Binance Transaction History CSV import parser.
//!
//! Unlike the `Parser` trait (one on-chain transaction in, one journal
//! entry out), a CSV row group shares a timestamp and may span several
//! rows belonging to one logical transaction (e.g. a convert's buy leg
//! and sell leg). Rows are grouped by `utc_time` and each group is
//! dispatched to an operation-specific handler.

use crate::model::EntryType;
use crate::parsers::{AccountRef, ParsedSplit};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

const TRADE_OPS: &[&str] = &["Transaction Buy", "Transaction Spend", "Transaction Fee", "Transaction Sold", "Transaction Revenue"];
const EARN_OPS: &[&str] = &[
    "Simple Earn Flexible Subscription",
    "Simple Earn Flexible Redemption",
    "Simple Earn Locked Subscription",
    "Simple Earn Flexible Interest",
    "Simple Earn Locked Rewards",
];
const FUTURES_OPS: &[&str] = &["Fee", "Funding Fee", "Realized Profit and Loss"];
const MARGIN_OPS: &[&str] = &[
    "Isolated Margin Loan",
    "Isolated Margin Liquidation - Forced Repayment",
    "Cross Margin Liquidation - Small Assets Takeover",
];
const LOAN_OPS: &[&str] = &["Flexible Loan - Collateral Transfer", "Flexible Loan - Lending", "Flexible Loan - Repayment"];
const SPECIAL_TOKEN_OPS: &[&str] =
    &["RWUSD - Subscription", "RWUSD - Distribution", "RWUSD - Redemption", "BFUSD Subscription", "BFUSD Daily Reward", "WBETH2.0 - Staking"];
const TRANSFER_FUND_OPS: &[&str] = &["Transfer Funds to Spot", "Transfer Funds to Funding Wallet"];

#[derive(Debug, Clone)]
pub struct CsvRow {
    pub row_number: i64,
    pub utc_time: String,
    pub account: String,
    pub operation: String,
    pub coin: String,
    pub change: Decimal,
    pub remark: Option<String>,
}

impl CsvRow {
    pub fn from_fields(row_number: i64, utc_time: &str, account: &str, operation: &str, coin: &str, change: &str, remark: Option<&str>) -> Self {
        Self {
            row_number,
            utc_time: utc_time.to_string(),
            account: account.to_string(),
            operation: operation.to_string(),
            coin: coin.to_string(),
            change: Decimal::from_str(change).unwrap_or(Decimal::ZERO),
            remark: remark.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub splits: Vec<ParsedSplit>,
    pub entry_type: EntryType,
    pub utc_time: String,
    pub source_row_numbers: Vec<i64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ParseStats {
    pub total: usize,
    pub parsed: usize,
    pub errors: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct SkippedRow {
    pub row_number: i64,
    pub reason: String,
}

fn group_by_timestamp(rows: &[CsvRow]) -> BTreeMap<String, Vec<&CsvRow>> {
    let mut groups: BTreeMap<String, Vec<&CsvRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.utc_time.clone()).or_default().push(row);
    }
    groups
}

/// Parse every row in one import. Returns the balanced entries to be
/// journaled plus the rows that had to be skipped (unknown operation).
pub fn parse_rows(rows: &[CsvRow]) -> (Vec<ParsedEntry>, Vec<SkippedRow>, ParseStats) {
    let mut stats = ParseStats { total: rows.len(), ..Default::default() };
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for (utc_time, group_rows) in group_by_timestamp(rows) {
        let (group_entries, group_skipped) = parse_group(&utc_time, &group_rows);
        stats.parsed += group_entries.iter().map(|e| e.source_row_numbers.len()).sum::<usize>();
        stats.skipped += group_skipped.len();
        entries.extend(group_entries);
        skipped.extend(group_skipped);
    }

    (entries, skipped, stats)
}

fn parse_group(utc_time: &str, rows: &[&CsvRow]) -> (Vec<ParsedEntry>, Vec<SkippedRow>) {
    let trade_rows: Vec<&&CsvRow> = rows.iter().filter(|r| TRADE_OPS.contains(&r.operation.as_str())).collect();
    let convert_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation == "Binance Convert").collect();
    let deposit_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation == "Deposit").collect();
    let withdraw_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation == "Withdraw").collect();
    let p2p_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation == "P2P Trading").collect();
    let transfer_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation.contains("Transfer Between")).collect();
    let earn_rows: Vec<&&CsvRow> = rows.iter().filter(|r| EARN_OPS.contains(&r.operation.as_str())).collect();
    let futures_rows: Vec<&&CsvRow> = rows.iter().filter(|r| FUTURES_OPS.contains(&r.operation.as_str())).collect();
    let margin_rows: Vec<&&CsvRow> = rows.iter().filter(|r| MARGIN_OPS.contains(&r.operation.as_str())).collect();
    let loan_rows: Vec<&&CsvRow> = rows.iter().filter(|r| LOAN_OPS.contains(&r.operation.as_str())).collect();
    let special_rows: Vec<&&CsvRow> = rows.iter().filter(|r| SPECIAL_TOKEN_OPS.contains(&r.operation.as_str())).collect();
    let cashback_rows: Vec<&&CsvRow> = rows.iter().filter(|r| r.operation == "Cashback Voucher").collect();
    let fund_transfer_rows: Vec<&&CsvRow> = rows.iter().filter(|r| TRANSFER_FUND_OPS.contains(&r.operation.as_str())).collect();

    let mut categorised: std::collections::HashSet<i64> = std::collections::HashSet::new();
    for group in [
        &trade_rows, &convert_rows, &deposit_rows, &withdraw_rows, &p2p_rows, &transfer_rows, &earn_rows, &futures_rows, &margin_rows, &loan_rows,
        &special_rows, &cashback_rows, &fund_transfer_rows,
    ] {
        for r in group {
            categorised.insert(r.row_number);
        }
    }

    let mut entries = Vec::new();

    if !trade_rows.is_empty() {
        entries.push(handle_spot_trade(utc_time, &trade_rows));
    }
    if !convert_rows.is_empty() {
        entries.push(handle_convert(utc_time, &convert_rows));
    }
    for r in &deposit_rows {
        entries.push(handle_deposit(utc_time, r));
    }
    for r in &withdraw_rows {
        entries.push(handle_withdraw(utc_time, r));
    }
    for r in &p2p_rows {
        entries.push(handle_p2p(utc_time, r));
    }
    if !transfer_rows.is_empty() {
        entries.push(handle_internal_transfer(utc_time, &transfer_rows));
    }
    for r in &earn_rows {
        entries.push(handle_earn(utc_time, r));
    }
    for r in &futures_rows {
        entries.push(handle_futures(utc_time, r));
    }
    for r in &margin_rows {
        entries.push(handle_margin(utc_time, r));
    }
    for r in &loan_rows {
        entries.push(handle_loan(utc_time, r));
    }
    if !special_rows.is_empty() {
        entries.extend(handle_special_tokens(utc_time, &special_rows));
    }
    for r in &cashback_rows {
        entries.push(handle_cashback(utc_time, r));
    }
    if !fund_transfer_rows.is_empty() {
        entries.push(handle_internal_transfer(utc_time, &fund_transfer_rows));
    }

    let skipped = rows
        .iter()
        .filter(|r| !categorised.contains(&r.row_number))
        .map(|r| SkippedRow { row_number: r.row_number, reason: format!("Operation '{}' not handled", r.operation) })
        .collect();

    (entries, skipped)
}

fn entry(utc_time: &str, entry_type: EntryType, splits: Vec<ParsedSplit>, rows: &[i64]) -> ParsedEntry {
    ParsedEntry { splits, entry_type, utc_time: utc_time.to_string(), source_row_numbers: rows.to_vec() }
}

fn handle_spot_trade(utc_time: &str, rows: &[&&CsvRow]) -> ParsedEntry {
    let mut splits = Vec::new();
    for row in rows {
        if row.operation == "Transaction Fee" {
            splits.push(ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change));
            splits.push(ParsedSplit::new(AccountRef::WalletExpense, &row.coin, -row.change));
        } else {
            splits.push(ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change));
        }
    }
    entry(utc_time, EntryType::Swap, splits, &rows.iter().map(|r| r.row_number).collect::<Vec<_>>())
}

fn handle_convert(utc_time: &str, rows: &[&&CsvRow]) -> ParsedEntry {
    let splits = rows.iter().map(|row| ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change)).collect();
    entry(utc_time, EntryType::Swap, splits, &rows.iter().map(|r| r.row_number).collect::<Vec<_>>())
}

fn handle_deposit(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let splits = vec![
        ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change),
        ParsedSplit::new(AccountRef::ExternalTransfer { ext_address: "deposit".to_string() }, &row.coin, -row.change),
    ];
    entry(utc_time, EntryType::Deposit, splits, &[row.row_number])
}

fn handle_withdraw(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let splits = vec![
        ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change),
        ParsedSplit::new(AccountRef::ExternalTransfer { ext_address: "withdrawal".to_string() }, &row.coin, -row.change),
    ];
    entry(utc_time, EntryType::Withdrawal, splits, &[row.row_number])
}

fn handle_p2p(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let splits = vec![
        ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change),
        ParsedSplit::new(AccountRef::ExternalTransfer { ext_address: "p2p".to_string() }, &row.coin, -row.change),
    ];
    entry(utc_time, EntryType::Deposit, splits, &[row.row_number])
}

fn handle_internal_transfer(utc_time: &str, rows: &[&&CsvRow]) -> ParsedEntry {
    let splits = rows.iter().map(|row| ParsedSplit::new(AccountRef::CexAsset, &row.coin, row.change)).collect();
    entry(utc_time, EntryType::Transfer, splits, &rows.iter().map(|r| r.row_number).collect::<Vec<_>>())
}

fn handle_earn(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let amount = row.change;
    match row.operation.as_str() {
        "Simple Earn Flexible Subscription" | "Simple Earn Locked Subscription" => entry(
            utc_time,
            EntryType::Deposit,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolAsset { protocol: "binance_earn".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Simple Earn Flexible Redemption" => entry(
            utc_time,
            EntryType::Withdrawal,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolAsset { protocol: "binance_earn".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Simple Earn Flexible Interest" | "Simple Earn Locked Rewards" => entry(
            utc_time,
            EntryType::Yield,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::WalletIncome { tag: "Earn Interest".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        _ => entry(utc_time, EntryType::Unknown, vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount)], &[row.row_number]),
    }
}

fn handle_futures(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let amount = row.change;
    match row.operation.as_str() {
        "Fee" => entry(
            utc_time,
            EntryType::GasFee,
            vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount), ParsedSplit::new(AccountRef::WalletExpense, &row.coin, -amount)],
            &[row.row_number],
        ),
        "Funding Fee" if amount < Decimal::ZERO => entry(
            utc_time,
            EntryType::GasFee,
            vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount), ParsedSplit::new(AccountRef::WalletExpense, &row.coin, -amount)],
            &[row.row_number],
        ),
        "Funding Fee" => entry(
            utc_time,
            EntryType::Yield,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::WalletIncome { tag: "Funding Fee".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Realized Profit and Loss" if amount >= Decimal::ZERO => entry(
            utc_time,
            EntryType::Yield,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::WalletIncome { tag: "Futures PnL".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Realized Profit and Loss" => entry(
            utc_time,
            EntryType::GasFee,
            vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount), ParsedSplit::new(AccountRef::WalletExpense, &row.coin, -amount)],
            &[row.row_number],
        ),
        _ => entry(utc_time, EntryType::Unknown, vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount)], &[row.row_number]),
    }
}

fn handle_margin(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let amount = row.change;
    let protocol_debt = |entry_type| {
        entry(
            utc_time,
            entry_type,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolDebt { protocol: "binance_margin".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        )
    };
    match row.operation.as_str() {
        "Isolated Margin Loan" => protocol_debt(EntryType::Borrow),
        "Isolated Margin Liquidation - Forced Repayment" => protocol_debt(EntryType::Repay),
        "Cross Margin Liquidation - Small Assets Takeover" => protocol_debt(EntryType::Liquidation),
        _ => entry(utc_time, EntryType::Unknown, vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount)], &[row.row_number]),
    }
}

fn handle_loan(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let amount = row.change;
    match row.operation.as_str() {
        "Flexible Loan - Collateral Transfer" => entry(
            utc_time,
            EntryType::Deposit,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolAsset { protocol: "binance_loan".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Flexible Loan - Lending" => entry(
            utc_time,
            EntryType::Borrow,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolDebt { protocol: "binance_loan".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        "Flexible Loan - Repayment" => entry(
            utc_time,
            EntryType::Repay,
            vec![
                ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                ParsedSplit::new(AccountRef::ProtocolDebt { protocol: "binance_loan".to_string() }, &row.coin, -amount),
            ],
            &[row.row_number],
        ),
        _ => entry(utc_time, EntryType::Unknown, vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount)], &[row.row_number]),
    }
}

fn handle_special_tokens(utc_time: &str, rows: &[&&CsvRow]) -> Vec<ParsedEntry> {
    rows.iter()
        .map(|row| {
            let amount = row.change;
            match row.operation.as_str() {
                "RWUSD - Distribution" | "BFUSD Daily Reward" => entry(
                    utc_time,
                    EntryType::Yield,
                    vec![
                        ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
                        ParsedSplit::new(AccountRef::WalletIncome { tag: "Token Reward".to_string() }, &row.coin, -amount),
                    ],
                    &[row.row_number],
                ),
                _ => entry(utc_time, EntryType::Swap, vec![ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount)], &[row.row_number]),
            }
        })
        .collect()
}

fn handle_cashback(utc_time: &str, row: &CsvRow) -> ParsedEntry {
    let amount = row.change;
    entry(
        utc_time,
        EntryType::Yield,
        vec![
            ParsedSplit::new(AccountRef::CexAsset, &row.coin, amount),
            ParsedSplit::new(AccountRef::WalletIncome { tag: "Cashback".to_string() }, &row.coin, -amount),
        ],
        &[row.row_number],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_row_produces_balanced_entry() {
        let row = CsvRow::from_fields(1, "2024-01-01 00:00:00", "Spot", "Deposit", "BTC", "0.5", None);
        let entry = handle_deposit("2024-01-01 00:00:00", &row);
        let total: Decimal = entry.splits.iter().map(|s| s.quantity).sum();
        assert_eq!(total, Decimal::ZERO);
        assert_eq!(entry.entry_type, EntryType::Deposit);
    }

    #[test]
    fn unknown_operation_is_skipped_not_errored() {
        let rows = vec![CsvRow::from_fields(1, "2024-01-01 00:00:00", "Spot", "Some Unknown Op", "BTC", "1", None)];
        let (entries, skipped, stats) = parse_rows(&rows);
        assert!(entries.is_empty());
        assert_eq!(skipped.len(), 1);
        assert_eq!(stats.skipped, 1);
    }
}
