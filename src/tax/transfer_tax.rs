//! Per-transfer Vietnam transaction tax (spec §4.6 step 3).

use super::SplitWithAccount;
use crate::model::{AccountSubtype, EntryType, ExemptionReason, TaxableTransferRecord};
use rust_decimal::Decimal;
use uuid::Uuid;

/// 0.1% transfer tax rate.
pub const TAX_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

fn is_asset_subtype(subtype: AccountSubtype) -> bool {
    matches!(subtype, AccountSubtype::NativeAsset | AccountSubtype::Erc20Token | AccountSubtype::ProtocolAsset)
}

/// Computes a `TaxableTransferRecord` for every outgoing (`quantity <
/// 0`) asset split. Exemption priority: `GAS_FEE` entry type wins over
/// the `BELOW_THRESHOLD` value check — see `ExemptionReason`'s doc
/// comment for why the name looks backwards from the numeric test.
pub fn calculate_transfer_tax(
    entity_id: Uuid,
    splits: &[SplitWithAccount],
    usd_vnd_rate: Decimal,
    exemption_threshold_vnd: Decimal,
) -> Vec<TaxableTransferRecord> {
    splits
        .iter()
        .filter(|s| is_asset_subtype(s.account_subtype) && s.quantity < Decimal::ZERO)
        .map(|s| {
            let value_usd = s.value_usd.map(|v| v.abs()).unwrap_or(Decimal::ZERO);
            let value_vnd = value_usd * usd_vnd_rate;
            let tax_vnd = value_vnd * TAX_RATE;

            let mut exemption = if value_vnd > exemption_threshold_vnd { Some(ExemptionReason::BelowThreshold) } else { None };
            if s.entry_type == EntryType::GasFee {
                exemption = Some(ExemptionReason::GasFee);
            }

            TaxableTransferRecord {
                id: Uuid::new_v4(),
                entity_id,
                journal_entry_id: s.journal_entry_id,
                value_vnd,
                tax_vnd: if exemption.is_none() { tax_vnd } else { Decimal::ZERO },
                exemption_reason: exemption,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn split(subtype: AccountSubtype, quantity: Decimal, value_usd: Option<Decimal>, entry_type: EntryType) -> SplitWithAccount {
        SplitWithAccount {
            symbol: "ETH".to_string(),
            account_subtype: subtype,
            quantity,
            value_usd,
            timestamp: Utc::now(),
            journal_entry_id: Uuid::new_v4(),
            entry_type,
        }
    }

    #[test]
    fn gas_fee_overrides_below_threshold_exemption() {
        let entity_id = Uuid::new_v4();
        let s = split(AccountSubtype::NativeAsset, Decimal::new(-1, 0), Some(Decimal::new(-5, 0)), EntryType::GasFee);
        let records = calculate_transfer_tax(entity_id, &[s], Decimal::new(25_000, 0), Decimal::new(20_000_000, 0));
        assert_eq!(records[0].exemption_reason, Some(ExemptionReason::GasFee));
        assert_eq!(records[0].tax_vnd, Decimal::ZERO);
    }

    #[test]
    fn large_transfer_is_exempt_as_below_threshold() {
        let entity_id = Uuid::new_v4();
        // value_usd=2000, rate=25_000 -> value_vnd=50_000_000 > 20M threshold
        let s = split(AccountSubtype::Erc20Token, Decimal::new(-1, 0), Some(Decimal::new(-2000, 0)), EntryType::Transfer);
        let records = calculate_transfer_tax(entity_id, &[s], Decimal::new(25_000, 0), Decimal::new(20_000_000, 0));
        assert_eq!(records[0].exemption_reason, Some(ExemptionReason::BelowThreshold));
        assert_eq!(records[0].tax_vnd, Decimal::ZERO);
    }

    #[test]
    fn small_transfer_is_taxed_at_one_tenth_percent() {
        let entity_id = Uuid::new_v4();
        // value_usd=100, rate=25_000 -> value_vnd=2_500_000, tax=2_500
        let s = split(AccountSubtype::Erc20Token, Decimal::new(-1, 0), Some(Decimal::new(-100, 0)), EntryType::Transfer);
        let records = calculate_transfer_tax(entity_id, &[s], Decimal::new(25_000, 0), Decimal::new(20_000_000, 0));
        assert_eq!(records[0].exemption_reason, None);
        assert_eq!(records[0].tax_vnd, Decimal::new(2500, 0));
    }

    #[test]
    fn positive_quantity_splits_are_ignored() {
        let entity_id = Uuid::new_v4();
        let s = split(AccountSubtype::Erc20Token, Decimal::new(1, 0), Some(Decimal::new(100, 0)), EntryType::Transfer);
        let records = calculate_transfer_tax(entity_id, &[s], Decimal::new(25_000, 0), Decimal::new(20_000_000, 0));
        assert!(records.is_empty());
    }
}
