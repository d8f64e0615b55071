use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::journal::EntryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Loaded,
    Parsed,
    Error,
    Ignored,
}

/// The opaque raw blob plus the identifying triple
/// `(wallet_id, chain, tx_hash)`, which is unique (invariant I1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub chain: String,
    pub tx_hash: String,
    pub block_number: i64,
    pub timestamp: DateTime<Utc>,
    pub raw_data: Value,
    pub status: TransactionStatus,
    pub entry_type: Option<EntryType>,
}

/// Attached when a transaction fails to parse or balance. `resolved`
/// lets an operator mark an entry as manually reconciled without
/// deleting the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseErrorRecord {
    pub id: Uuid,
    pub tx_id: Option<Uuid>,
    pub wallet_id: Option<Uuid>,
    pub error_kind: String,
    pub message: String,
    pub diagnostic_blob: Value,
    pub resolved: bool,
}
