//! `AccountMapper` — get-or-create accounts by hierarchical label key
//! (spec §4.2). Every accessor builds a stable key from the wallet's
//! prefix plus a subtype suffix and resolves it through the repo,
//! memoizing in-process to avoid repeat round-trips within one batch.

use crate::model::{Account, AccountSubtype, AccountType, Wallet};
use crate::parsers::native_symbol;
use crate::storage::AccountRepo;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

pub struct AccountMapper<'a, R: AccountRepo> {
    repo: &'a R,
    cache: Mutex<HashMap<String, Account>>,
}

impl<'a, R: AccountRepo> AccountMapper<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo, cache: Mutex::new(HashMap::new()) }
    }

    pub fn native_asset(&self, wallet: &Wallet) -> crate::errors::LedgerResult<Account> {
        let chain = on_chain_field(wallet);
        let symbol = native_symbol(&chain);
        let key = format!("{}:native_asset", wallet.label_prefix());
        self.get_or_create(&key, AccountType::Asset, AccountSubtype::NativeAsset, symbol, None, None)
    }

    pub fn erc20_token(&self, wallet: &Wallet, token_address: &str, symbol: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:erc20:{}:{}", wallet.label_prefix(), symbol, token_address);
        self.get_or_create(&key, AccountType::Asset, AccountSubtype::Erc20Token, symbol, Some(token_address.to_string()), None)
    }

    pub fn gas_expense(&self, wallet: &Wallet) -> crate::errors::LedgerResult<Account> {
        let chain = on_chain_field(wallet);
        let symbol = native_symbol(&chain);
        let key = format!("{}:expense:gas", wallet.label_prefix());
        self.get_or_create(&key, AccountType::Expense, AccountSubtype::WalletExpense, symbol, None, None)
    }

    /// CEX fee expense account for a specific asset.
    pub fn cex_expense(&self, wallet: &Wallet, symbol: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:expense:{}", wallet.label_prefix(), symbol);
        self.get_or_create(&key, AccountType::Expense, AccountSubtype::WalletExpense, symbol, None, None)
    }

    pub fn external_transfer(&self, wallet: &Wallet, symbol: &str, ext_address: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:external:{}:{}", wallet.label_prefix(), symbol, ext_address);
        self.get_or_create(&key, AccountType::Asset, AccountSubtype::ExternalTransfer, symbol, Some(ext_address.to_string()), None)
    }

    /// CEX asset holding account (e.g. BTC on Binance).
    pub fn cex_asset(&self, wallet: &Wallet, symbol: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:asset:{}", wallet.label_prefix(), symbol);
        self.get_or_create(&key, AccountType::Asset, AccountSubtype::CexAsset, symbol, None, None)
    }

    pub fn protocol_asset(&self, wallet: &Wallet, protocol: &str, symbol: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:protocol:{}:asset:{}", wallet.label_prefix(), protocol, symbol);
        self.get_or_create(&key, AccountType::Asset, AccountSubtype::ProtocolAsset, symbol, None, Some(protocol.to_string()))
    }

    pub fn protocol_debt(&self, wallet: &Wallet, protocol: &str, symbol: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:protocol:{}:debt:{}", wallet.label_prefix(), protocol, symbol);
        self.get_or_create(&key, AccountType::Liability, AccountSubtype::ProtocolDebt, symbol, None, Some(protocol.to_string()))
    }

    pub fn income(&self, wallet: &Wallet, symbol: &str, tag: &str) -> crate::errors::LedgerResult<Account> {
        let key = format!("{}:income:{}:{}", wallet.label_prefix(), tag, symbol);
        self.get_or_create(&key, AccountType::Income, AccountSubtype::WalletIncome, symbol, None, None)
    }

    fn get_or_create(
        &self,
        key: &str,
        account_type: AccountType,
        subtype: AccountSubtype,
        symbol: &str,
        token_address: Option<String>,
        protocol: Option<String>,
    ) -> crate::errors::LedgerResult<Account> {
        if let Some(cached) = self.cache.lock().get(key) {
            return Ok(cached.clone());
        }

        let candidate = Account {
            id: Uuid::new_v4(),
            label: key.to_string(),
            account_type,
            subtype,
            symbol: symbol.to_string(),
            token_address,
            protocol,
            balance_type: match subtype {
                AccountSubtype::ProtocolAsset => Some("supply".to_string()),
                AccountSubtype::ProtocolDebt => Some("borrow".to_string()),
                _ => None,
            },
        };

        let account = self.repo.get_or_create_account(&candidate)?;
        self.cache.lock().insert(key.to_string(), account.clone());
        Ok(account)
    }
}

fn on_chain_field(wallet: &Wallet) -> String {
    match wallet {
        Wallet::OnChain(w) => w.chain.clone(),
        Wallet::Cex(_) => "ethereum".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OnChainWallet, SyncStatus};
    use crate::storage::SqliteStore;

    fn test_wallet() -> Wallet {
        Wallet::OnChain(OnChainWallet {
            id: Uuid::new_v4(),
            entity_id: Uuid::new_v4(),
            chain: "ethereum".to_string(),
            address: "0xabc".to_string(),
            last_block_loaded: 0,
            sync_status: SyncStatus::Idle,
        })
    }

    #[test]
    fn native_asset_is_memoized_across_calls() {
        let store = SqliteStore::in_memory().unwrap();
        let mapper = AccountMapper::new(&store);
        let wallet = test_wallet();

        let first = mapper.native_asset(&wallet).unwrap();
        let second = mapper.native_asset(&wallet).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.label, format!("{}:native_asset", wallet.label_prefix()));
    }

    #[test]
    fn erc20_token_key_includes_symbol_and_address() {
        let store = SqliteStore::in_memory().unwrap();
        let mapper = AccountMapper::new(&store);
        let wallet = test_wallet();

        let account = mapper.erc20_token(&wallet, "0xusdc", "USDC").unwrap();
        assert_eq!(account.label, format!("{}:erc20:USDC:0xusdc", wallet.label_prefix()));
        assert_eq!(account.token_address.as_deref(), Some("0xusdc"));
    }
}
