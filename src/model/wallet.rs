use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `IDLE -> SYNCING -> SYNCED|ERROR`. A wallet re-enters `SYNCING` on
/// every load attempt; it never goes back to `IDLE` once touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Error,
}

/// Polymorphic wallet. The source stores these in a single table with
/// a discriminator column; here the variant set is closed, so a tagged
/// enum carries the same information without a nullable-everything
/// struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Wallet {
    OnChain(OnChainWallet),
    Cex(CexWallet),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnChainWallet {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub chain: String,
    pub address: String,
    /// Last EVM block number or Solana slot successfully ingested.
    pub last_block_loaded: i64,
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CexWallet {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub exchange: String,
    /// Opaque, already-encrypted at rest; this layer never decrypts it,
    /// only passes it through to the exchange-specific loader.
    pub encrypted_credentials: String,
    pub last_trade_id: Option<String>,
    pub last_synced_at: Option<chrono::DateTime<chrono::Utc>>,
    pub sync_status: SyncStatus,
}

impl Wallet {
    pub fn id(&self) -> Uuid {
        match self {
            Wallet::OnChain(w) => w.id,
            Wallet::Cex(w) => w.id,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Wallet::OnChain(w) => w.entity_id,
            Wallet::Cex(w) => w.entity_id,
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        match self {
            Wallet::OnChain(w) => w.sync_status,
            Wallet::Cex(w) => w.sync_status,
        }
    }

    pub fn set_sync_status(&mut self, status: SyncStatus) {
        match self {
            Wallet::OnChain(w) => w.sync_status = status,
            Wallet::Cex(w) => w.sync_status = status,
        }
    }

    /// The `wallet_prefix` used by the account-mapper label-key
    /// algorithm (spec §4.2): `{chain}:{address}` for on-chain,
    /// `cex:{exchange}:{wallet_id}` for CEX.
    pub fn label_prefix(&self) -> String {
        match self {
            Wallet::OnChain(w) => format!("{}:{}", w.chain, w.address),
            Wallet::Cex(w) => format!("cex:{}:{}", w.exchange, w.id),
        }
    }

    /// The set of addresses this wallet owns, used to build a
    /// `TransactionContext`. Singleton for on-chain wallets, empty for
    /// CEX wallets (which never see raw transfers). EVM addresses are
    /// lowercased to match the extractor's normalization; Solana
    /// base58 addresses are case-sensitive and kept as-is.
    pub fn owned_addresses(&self) -> Vec<String> {
        match self {
            Wallet::OnChain(w) if w.chain == "solana" => vec![w.address.clone()],
            Wallet::OnChain(w) => vec![w.address.to_lowercase()],
            Wallet::Cex(_) => Vec::new(),
        }
    }
}
