//! Turns a chain-specific raw blob into a flat list of `RawTransfer`s
//! (and, where the chain emits them, `EventData`) — spec §4.1.

mod evm;
mod solana;

pub use evm::extract_evm_transfers;
pub use solana::extract_solana_transfers;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Native,
    Internal,
    Erc20,
    Spl,
}

/// Addresses are normalized case: lowercase for EVM, preserved for
/// base58 Solana.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransfer {
    pub token_address: Option<String>,
    pub from: String,
    pub to: String,
    pub value_units: u128,
    pub decimals: u32,
    pub symbol: String,
    pub kind: TransferKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    pub contract_address: String,
    pub args: serde_json::Value,
}

pub fn native_symbol(chain: &str) -> &'static str {
    match chain {
        "ethereum" | "arbitrum" | "optimism" | "base" | "zksync" | "linea" | "scroll" => "ETH",
        "polygon" => "MATIC",
        "bsc" => "BNB",
        "avalanche" => "AVAX",
        "solana" => "SOL",
        _ => "ETH",
    }
}

/// Extracts transfers + events from an already chain-tagged raw blob.
/// Dispatches to the EVM or Solana path per spec §4.1.
pub fn extract_all_transfers(chain: &str, raw_data: &serde_json::Value) -> Vec<RawTransfer> {
    if chain == "solana" {
        solana::extract_solana_transfers(raw_data)
    } else {
        evm::extract_evm_transfers(raw_data, chain)
    }
}
