use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Transfer,
    Swap,
    Deposit,
    Withdrawal,
    Bridge,
    Liquidation,
    Mint,
    Burn,
    GasFee,
    Borrow,
    Repay,
    Yield,
    Unknown,
}

/// Entry types whose splits legitimately span multiple symbols; the
/// per-symbol zero-sum invariant is not enforced for these (spec §3).
pub const MULTI_SYMBOL: &[EntryType] = &[
    EntryType::Swap,
    EntryType::Deposit,
    EntryType::Withdrawal,
    EntryType::Bridge,
    EntryType::Liquidation,
    EntryType::Mint,
    EntryType::Burn,
];

impl EntryType {
    pub fn is_multi_symbol(self) -> bool {
        MULTI_SYMBOL.contains(&self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub entry_type: EntryType,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub splits: Vec<JournalSplit>,
}

impl JournalEntry {
    /// Per-symbol quantity sum across splits, excluding pairs that
    /// never carry a symbol balance (none do today, but the hook
    /// exists for forward compatibility with non-symbol splits).
    pub fn symbol_balance(&self) -> std::collections::HashMap<String, Decimal> {
        let mut totals = std::collections::HashMap::new();
        for split in &self.splits {
            *totals.entry(split.symbol.clone()).or_insert(Decimal::ZERO) += split.quantity;
        }
        totals
    }

    pub fn value_usd_balance(&self) -> Decimal {
        self.splits
            .iter()
            .filter_map(|s| s.value_usd)
            .sum()
    }

    pub fn value_vnd_balance(&self) -> Decimal {
        self.splits
            .iter()
            .filter_map(|s| s.value_vnd)
            .sum()
    }
}

/// One signed leg of a journal entry. Positive quantity is a credit to
/// the account; negative is a debit. `value_usd` keeps the sign of
/// `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSplit {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub value_usd: Option<Decimal>,
    pub value_vnd: Option<Decimal>,
}
