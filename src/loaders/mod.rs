//! Transaction loaders: EVM (Etherscan-v2), Solana (JSON-RPC), and
//! Binance (authenticated REST + CSV import) — spec §4.7.

mod cex;
mod evm;
mod range_splitter;
mod solana;

pub use cex::{import_csv, BinanceClient, CsvImportStats};
pub use evm::EtherscanClient;
pub use range_splitter::fetch_range;
pub use solana::SolanaRpcClient;

pub use cex::load_wallet as load_binance_wallet;
pub use evm::load_wallet as load_evm_wallet;
pub use solana::load_wallet as load_solana_wallet;
