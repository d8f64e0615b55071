//! Cross-module scenarios mirroring the end-to-end examples: FIFO
//! lot matching through the tax engine (S1-S3), a gas-only EVM
//! transaction through the bookkeeper (S4), an Aave V3 supply through
//! the default parser registry (S5), and transfer tax exemption
//! priority through the tax engine (S6).

use chrono::{DateTime, TimeZone, Utc};
use ledger_engine::account_mapper::AccountMapper;
use ledger_engine::bookkeeper::Bookkeeper;
use ledger_engine::model::{
    Entity, EntryType, JournalEntry, JournalSplit, OnChainWallet, SyncStatus, Transaction, TransactionStatus, Wallet,
};
use ledger_engine::parsers::build_default_registry;
use ledger_engine::storage::{EntityRepo, JournalRepo, SqliteStore};
use ledger_engine::tax::{TaxConfig, TaxEngine};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

fn day(n: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + n * 86_400, 0).unwrap()
}

fn eth_wallet(entity_id: Uuid) -> Wallet {
    Wallet::OnChain(OnChainWallet {
        id: Uuid::new_v4(),
        entity_id,
        chain: "ethereum".to_string(),
        address: "0xabc0000000000000000000000000000000abc0".to_string(),
        last_block_loaded: 0,
        sync_status: SyncStatus::Idle,
    })
}

fn push_trade_entry(
    store: &SqliteStore,
    entity_id: Uuid,
    account_id: Uuid,
    symbol: &str,
    quantity: Decimal,
    value_usd: Decimal,
    timestamp: DateTime<Utc>,
) {
    push_entry(store, entity_id, account_id, symbol, quantity, value_usd, timestamp, EntryType::Transfer);
}

fn push_entry(
    store: &SqliteStore,
    entity_id: Uuid,
    account_id: Uuid,
    symbol: &str,
    quantity: Decimal,
    value_usd: Decimal,
    timestamp: DateTime<Utc>,
    entry_type: EntryType,
) {
    let entry = JournalEntry {
        id: Uuid::new_v4(),
        entity_id,
        transaction_id: None,
        entry_type,
        description: format!("{symbol} entry"),
        timestamp,
        splits: vec![JournalSplit {
            id: Uuid::new_v4(),
            entry_id: Uuid::new_v4(),
            account_id,
            symbol: symbol.to_string(),
            quantity,
            value_usd: Some(value_usd),
            value_vnd: None,
        }],
    };
    store.insert_entry(&entry).unwrap();
}

/// S1: single buy, single full sell.
#[test]
fn fifo_single_lot_through_the_tax_engine() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s1", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);
    let mapper = AccountMapper::new(&store);
    let account = mapper.native_asset(&wallet).unwrap();

    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(1, 0), Decimal::new(2000, 0), day(0));
    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(-1, 0), Decimal::new(-3000, 0), day(10));

    let engine = TaxEngine::new(&store, TaxConfig::new(Decimal::new(25_000, 0), Decimal::new(20_000_000, 0)));
    let summary = engine.calculate(entity.id, day(-1), day(11)).unwrap();

    assert_eq!(summary.closed_lots.len(), 1);
    let lot = &summary.closed_lots[0];
    assert_eq!(lot.cost_basis_usd, Decimal::new(2000, 0));
    assert_eq!(lot.proceeds_usd, Decimal::new(3000, 0));
    assert_eq!(lot.gain_usd, Decimal::new(1000, 0));
    assert_eq!(lot.holding_days, 10);
    assert!(summary.open_lots.is_empty());
    assert_eq!(summary.total_realized_gain_usd, Decimal::new(1000, 0));
}

/// S2: buy 2, sell 1 — one closed lot, one open remainder.
#[test]
fn fifo_partial_sell_through_the_tax_engine() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s2", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);
    let mapper = AccountMapper::new(&store);
    let account = mapper.native_asset(&wallet).unwrap();

    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(2, 0), Decimal::new(4000, 0), day(0));
    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(-1, 0), Decimal::new(-3000, 0), day(5));

    let engine = TaxEngine::new(&store, TaxConfig::new(Decimal::new(25_000, 0), Decimal::new(20_000_000, 0)));
    let summary = engine.calculate(entity.id, day(-1), day(6)).unwrap();

    assert_eq!(summary.closed_lots.len(), 1);
    assert_eq!(summary.closed_lots[0].qty, Decimal::new(1, 0));
    assert_eq!(summary.closed_lots[0].gain_usd, Decimal::new(1000, 0));

    assert_eq!(summary.open_lots.len(), 1);
    assert_eq!(summary.open_lots[0].remaining_qty, Decimal::new(1, 0));
    assert_eq!(summary.open_lots[0].cost_basis_per_unit_usd, Decimal::new(2000, 0));
}

/// S3: two buys at different prices, one sell — oldest lot consumed first.
#[test]
fn fifo_oldest_first_through_the_tax_engine() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s3", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);
    let mapper = AccountMapper::new(&store);
    let account = mapper.native_asset(&wallet).unwrap();

    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(1, 0), Decimal::new(1000, 0), day(0));
    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(1, 0), Decimal::new(2000, 0), day(5));
    push_trade_entry(&store, entity.id, account.id, "ETH", Decimal::new(-1, 0), Decimal::new(-3000, 0), day(10));

    let engine = TaxEngine::new(&store, TaxConfig::new(Decimal::new(25_000, 0), Decimal::new(20_000_000, 0)));
    let summary = engine.calculate(entity.id, day(-1), day(11)).unwrap();

    assert_eq!(summary.closed_lots.len(), 1);
    assert_eq!(summary.closed_lots[0].cost_basis_usd, Decimal::new(1000, 0));
    assert_eq!(summary.closed_lots[0].gain_usd, Decimal::new(2000, 0));

    assert_eq!(summary.open_lots.len(), 1);
    assert_eq!(summary.open_lots[0].cost_basis_per_unit_usd, Decimal::new(2000, 0));
}

/// S4: gas-only transaction (sender is our wallet, no value transfer)
/// produces a balanced GAS_FEE entry with two splits.
#[test]
fn gas_only_transaction_balances_through_the_bookkeeper() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s4", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);

    let registry = build_default_registry();
    let bookkeeper = Bookkeeper::new(&store, &registry, None);

    let mut tx = Transaction {
        id: Uuid::new_v4(),
        wallet_id: wallet.id(),
        chain: "ethereum".to_string(),
        tx_hash: "0xdeadbeef".to_string(),
        block_number: 100,
        timestamp: day(0),
        raw_data: json!({
            "from": "0xabc0000000000000000000000000000000abc0",
            "to": "0xsomeoneelse00000000000000000000000000",
            "value": "0",
            "gasUsed": 46000,
            "gasPrice": 20_000_000_000u64,
        }),
        status: TransactionStatus::Loaded,
        entry_type: None,
    };

    let entry = bookkeeper.process_transaction(&mut tx, &wallet, entity.id).unwrap().expect("gas-only tx should balance");

    assert_eq!(entry.entry_type, EntryType::GasFee);
    assert_eq!(entry.splits.len(), 2);
    let fee = Decimal::new(92, 5); // 0.00092
    let native_leg = entry.splits.iter().find(|s| s.quantity.is_sign_negative()).unwrap();
    let expense_leg = entry.splits.iter().find(|s| s.quantity.is_sign_positive()).unwrap();
    assert_eq!(native_leg.quantity, -fee);
    assert_eq!(expense_leg.quantity, fee);
    assert_eq!(entry.symbol_balance()["ETH"], Decimal::ZERO);
}

/// S5: Aave V3 supply — 1000 USDC in, 1000 aUSDC minted (consumed,
/// never re-emitted as a split).
#[test]
fn aave_supply_dispatches_through_the_default_registry() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s5", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);

    let registry = build_default_registry();
    let bookkeeper = Bookkeeper::new(&store, &registry, None);

    let pool_addr = "0x87870bca3f3fd6335c3f4ce8392d69350b4fa4e2";
    let mut tx = Transaction {
        id: Uuid::new_v4(),
        wallet_id: wallet.id(),
        chain: "ethereum".to_string(),
        tx_hash: "0xaave00000000000000000000000000000000000000000000000000000001".to_string(),
        block_number: 200,
        timestamp: day(0),
        raw_data: json!({
            "from": "0xabc0000000000000000000000000000000abc0",
            "to": pool_addr,
            "value": "0",
            "input": "0x617ba037000000000000000000000000000000000000000000000000000000000000",
            "gasUsed": 0,
            "gasPrice": 0,
            "token_transfers": [
                {
                    "contractAddress": "0xusdc",
                    "from": "0xabc0000000000000000000000000000000abc0",
                    "to": pool_addr,
                    "value": "1000000000",
                    "tokenDecimal": "6",
                    "tokenSymbol": "USDC"
                },
                {
                    "contractAddress": "0xausdc",
                    "from": pool_addr,
                    "to": "0xabc0000000000000000000000000000000abc0",
                    "value": "1000000000",
                    "tokenDecimal": "6",
                    "tokenSymbol": "aUSDC"
                }
            ]
        }),
        status: TransactionStatus::Loaded,
        entry_type: None,
    };

    let entry = bookkeeper.process_transaction(&mut tx, &wallet, entity.id).unwrap().expect("aave supply should parse");

    assert_eq!(entry.entry_type, EntryType::Deposit);
    let usdc_out = entry.splits.iter().find(|s| s.symbol == "USDC").expect("USDC leg");
    assert_eq!(usdc_out.quantity, Decimal::new(-1000, 0));
    assert!(entry.splits.iter().all(|s| s.symbol != "aUSDC"), "the aUSDC mint is consumed, not re-emitted");
}

/// S6: a small outgoing transfer is taxed at 0.1%; a gas-fee leg on
/// the same account never is, regardless of size.
#[test]
fn transfer_tax_through_the_tax_engine() {
    let store = SqliteStore::in_memory().unwrap();
    let entity = Entity::new("s6", "USD");
    store.create_entity(&entity).unwrap();
    let wallet = eth_wallet(entity.id);
    let mapper = AccountMapper::new(&store);
    let usdc = mapper.erc20_token(&wallet, "0xusdc", "USDC").unwrap();
    let native = mapper.native_asset(&wallet).unwrap();

    // 100 USDC sent out -> 2_500_000 VND @ 25_000 rate -> 2_500 VND tax.
    push_entry(&store, entity.id, usdc.id, "USDC", Decimal::new(-100, 0), Decimal::new(-100, 0), day(0), EntryType::Transfer);
    // A same-sized gas fee leg is exempt regardless of its value.
    push_entry(&store, entity.id, native.id, "ETH", Decimal::new(-100, 0), Decimal::new(-100, 0), day(1), EntryType::GasFee);

    let engine = TaxEngine::new(&store, TaxConfig::new(Decimal::new(25_000, 0), Decimal::new(20_000_000, 0)));
    let summary = engine.calculate(entity.id, day(-1), day(2)).unwrap();

    assert_eq!(summary.taxable_transfers.len(), 2);
    let transfer = summary.taxable_transfers.iter().find(|t| t.exemption_reason.is_none()).expect("taxed transfer");
    assert_eq!(transfer.tax_vnd, Decimal::new(2500, 0));
    let gas = summary.taxable_transfers.iter().find(|t| t.exemption_reason.is_some()).expect("exempt gas leg");
    assert_eq!(gas.tax_vnd, Decimal::ZERO);
    assert_eq!(summary.total_transfer_tax_vnd, Decimal::new(2500, 0));
}
