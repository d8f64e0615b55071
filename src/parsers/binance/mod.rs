//! Binance CEX parsing: the API-record parsers (trade/deposit/withdrawal)
//! and the separate Transaction History CSV importer.

pub mod api;
pub mod csv;

pub use api::{BinanceDepositParser, BinanceTradeParser, BinanceWithdrawalParser};
pub use csv::{parse_rows, CsvRow, ParseStats as CsvParseStats, ParsedEntry as CsvParsedEntry, SkippedRow};
