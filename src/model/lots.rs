use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A realized FIFO match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedLot {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub symbol: String,
    pub qty: Decimal,
    pub cost_basis_usd: Decimal,
    pub proceeds_usd: Decimal,
    pub gain_usd: Decimal,
    pub holding_days: i64,
    pub buy_entry_id: Uuid,
    pub sell_entry_id: Uuid,
    pub buy_ts: DateTime<Utc>,
    pub sell_ts: DateTime<Utc>,
}

/// An unmatched residual left in the FIFO queue at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenLot {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub symbol: String,
    pub remaining_qty: Decimal,
    pub cost_basis_per_unit_usd: Decimal,
    pub buy_entry_id: Uuid,
    pub buy_ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExemptionReason {
    GasFee,
    BelowThreshold,
}

/// A per-outgoing-split tax row (spec §4.6 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxableTransferRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub journal_entry_id: Uuid,
    pub value_vnd: Decimal,
    pub tax_vnd: Decimal,
    /// `None` means the transfer is taxable. The name `BelowThreshold`
    /// intentionally describes the rule tag, not the numeric test: the
    /// exemption fires when the value is *above* the threshold. Do not
    /// rename this away from the domain's own (misleading) wording.
    pub exemption_reason: Option<ExemptionReason>,
}
