use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Liability,
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountSubtype {
    NativeAsset,
    Erc20Token,
    ProtocolAsset,
    ProtocolDebt,
    WalletIncome,
    WalletExpense,
    ExternalTransfer,
    CexAsset,
}

impl AccountSubtype {
    /// The natural `AccountType` for a subtype. A subtype never
    /// changes account type across instances.
    pub fn account_type(self) -> AccountType {
        use AccountSubtype::*;
        match self {
            NativeAsset | Erc20Token | ProtocolAsset | CexAsset => AccountType::Asset,
            ProtocolDebt => AccountType::Liability,
            WalletIncome => AccountType::Income,
            WalletExpense => AccountType::Expense,
            ExternalTransfer => AccountType::Asset,
        }
    }
}

/// Identified by a stable label key (spec §4.2); created on first
/// reference and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub label: String,
    pub account_type: AccountType,
    pub subtype: AccountSubtype,
    pub symbol: String,
    pub token_address: Option<String>,
    pub protocol: Option<String>,
    /// Only meaningful for `protocol_asset`/`protocol_debt` in some
    /// protocols that distinguish stable vs. variable debt; most
    /// parsers leave this `None`.
    pub balance_type: Option<String>,
}
