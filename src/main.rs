mod cli;

use clap::Parser;
use ledger_engine::bookkeeper::Bookkeeper;
use ledger_engine::config::{self, with_config};
use ledger_engine::logger::{self, LogTag};
use ledger_engine::loaders::{self, EtherscanClient, SolanaRpcClient};
use ledger_engine::model::{Entity, OnChainWallet, SyncStatus, Wallet};
use ledger_engine::pricing::{CoinGeckoProvider, CryptoCompareProvider, PriceService};
use ledger_engine::storage::{EntityRepo, SqliteStore, TransactionRepo, WalletRepo};
use ledger_engine::tax::{TaxConfig, TaxEngine};
use rust_decimal::Decimal;
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    config::load_config().map_err(anyhow::Error::msg)?;
    logger::init_from_flags(cli.verbose, cli.quiet, &cli.debug_tags, &cli.verbose_tags);

    let store = SqliteStore::new(&with_config(|c| c.database.path.clone()))?;

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        cli::Command::LoadEvm { entity, wallet, chain } => {
            let mut on_chain = find_or_create_on_chain_wallet(&store, &entity, &chain, &wallet)?;
            let http = reqwest::Client::new();
            let etherscan = EtherscanClient::new(http, with_config(|c| c.loaders.etherscan_api_key.clone()), &chain)?;
            let loaded = runtime.block_on(loaders::load_evm_wallet(&store, &mut on_chain, &etherscan))?;
            println!("loaded {loaded} new transactions");
        }

        cli::Command::LoadSolana { entity, wallet } => {
            let mut on_chain = find_or_create_on_chain_wallet(&store, &entity, "solana", &wallet)?;
            let http = reqwest::Client::new();
            let rpc = SolanaRpcClient::new(http, with_config(|c| c.loaders.solana_rpc_url.clone()));
            let loaded = runtime.block_on(loaders::load_solana_wallet(&store, &mut on_chain, &rpc))?;
            println!("loaded {loaded} new transactions");
        }

        cli::Command::ImportBinanceCsv { entity, wallet, file } => {
            let entity_row = get_entity(&store, &entity)?;
            let wallet_id = Uuid::parse_str(&wallet).map_err(|e| anyhow::anyhow!("invalid wallet id: {e}"))?;
            let wallet_row = store
                .get_wallet(wallet_id)?
                .ok_or_else(|| anyhow::anyhow!("wallet {wallet_id} not found"))?;

            let registry = ledger_engine::parsers::build_default_registry();
            let bookkeeper = Bookkeeper::new(&store, &registry, None);
            let stats = loaders::import_csv(&bookkeeper, &wallet_row, entity_row.id, &file)?;
            println!(
                "imported {}/{} rows ({} skipped, {} errors)",
                stats.imported, stats.total, stats.skipped, stats.errors
            );
        }

        cli::Command::Process { entity } => {
            let entity_row = get_entity(&store, &entity)?;
            let registry = ledger_engine::parsers::build_default_registry();

            let http = reqwest::Client::new();
            let coingecko_key = with_config(|c| c.price_providers.coingecko_api_key.clone());
            let cryptocompare_key = with_config(|c| c.price_providers.cryptocompare_api_key.clone());
            let coingecko = (!coingecko_key.is_empty()).then(|| CoinGeckoProvider::new(http.clone(), coingecko_key));
            let cryptocompare = (!cryptocompare_key.is_empty()).then(|| CryptoCompareProvider::new(http.clone(), cryptocompare_key));
            let price_service = PriceService::new(&store, coingecko, cryptocompare, Decimal::new(25_000, 0));

            let bookkeeper = Bookkeeper::new(&store, &registry, Some(&price_service));

            let wallets = store.list_wallets_for_entity(entity_row.id)?;
            for wallet in wallets {
                let txs = store.list_loaded_for_wallet(wallet.id())?;
                let stats = bookkeeper.process_wallet(txs, &wallet, entity_row.id)?;
                println!("wallet {}: {} processed, {} errors, {} total", wallet.id(), stats.processed, stats.errors, stats.total);
            }
        }

        cli::Command::Tax { entity, start, end, usd_vnd_rate, exemption_threshold_vnd } => {
            let entity_row = get_entity(&store, &entity)?;
            let start = chrono::DateTime::parse_from_rfc3339(&start)?.with_timezone(&chrono::Utc);
            let end = chrono::DateTime::parse_from_rfc3339(&end)?.with_timezone(&chrono::Utc);

            let tax_config = TaxConfig::new(usd_vnd_rate.parse::<Decimal>()?, exemption_threshold_vnd.parse::<Decimal>()?);
            let engine = TaxEngine::new(&store, tax_config);
            let summary = engine.calculate(entity_row.id, start, end)?;

            println!(
                "realized gain: ${} | transfer tax: {} VND | exempt: {} VND | {} closed lots, {} open lots",
                summary.total_realized_gain_usd,
                summary.total_transfer_tax_vnd,
                summary.total_exempt_vnd,
                summary.closed_lots.len(),
                summary.open_lots.len(),
            );
        }
    }

    Ok(())
}

fn get_entity(store: &SqliteStore, name: &str) -> anyhow::Result<ledger_engine::model::Entity> {
    store
        .get_entity_by_name(name)?
        .ok_or_else(|| anyhow::anyhow!("entity '{name}' not found; create it first"))
}

fn find_or_create_entity(store: &SqliteStore, name: &str) -> anyhow::Result<Entity> {
    if let Some(entity) = store.get_entity_by_name(name)? {
        return Ok(entity);
    }
    let entity = Entity::new(name, "USD");
    store.create_entity(&entity)?;
    logger::info(LogTag::Bookkeeper, &format!("created entity '{name}' ({})", entity.id));
    Ok(entity)
}

fn find_or_create_on_chain_wallet(store: &SqliteStore, entity_name: &str, chain: &str, address: &str) -> anyhow::Result<Wallet> {
    let entity = find_or_create_entity(store, entity_name)?;

    let existing = store
        .list_wallets_for_entity(entity.id)?
        .into_iter()
        .find(|w| matches!(w, Wallet::OnChain(o) if o.chain == chain && o.address.eq_ignore_ascii_case(address)));

    if let Some(wallet) = existing {
        return Ok(wallet);
    }

    let wallet = Wallet::OnChain(OnChainWallet {
        id: Uuid::new_v4(),
        entity_id: entity.id,
        chain: chain.to_string(),
        address: address.to_string(),
        last_block_loaded: 0,
        sync_status: SyncStatus::Idle,
    });
    store.create_wallet(&wallet)?;
    Ok(wallet)
}
