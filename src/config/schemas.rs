use crate::config_struct;

config_struct! {
    /// SQLite store location and pragmas.
    pub struct DatabaseConfig {
        path: String = "ledger.db".to_string(),
    }
}

config_struct! {
    /// Token-bucket sizes per external provider (spec §5).
    pub struct RateLimitConfig {
        coingecko_per_minute: u32 = 120,
        cryptocompare_per_minute: u32 = 120,
        etherscan_per_minute: u32 = 300,
        solana_rpc_per_minute: u32 = 120,
        binance_per_minute: u32 = 1200,
    }
}

config_struct! {
    /// Provider API keys and timeouts for the pricing layer.
    pub struct PriceProviderConfig {
        coingecko_api_key: String = String::new(),
        cryptocompare_api_key: String = String::new(),
        request_timeout_secs: u64 = 30,
    }
}

config_struct! {
    /// Loader retry/backoff budgets (spec §5) plus the provider
    /// credentials each loader's client needs to reach its API.
    pub struct LoaderConfig {
        etherscan_max_retries: u32 = 3,
        solana_rpc_max_retries: u32 = 5,
        binance_max_retries: u32 = 3,
        reorg_safety_margin_blocks: u64 = 50,
        evm_page_size: u32 = 10_000,
        solana_signature_page_size: u32 = 1000,
        etherscan_api_key: String = String::new(),
        solana_rpc_url: String = "https://api.mainnet-beta.solana.com".to_string(),
        binance_api_key: String = String::new(),
        binance_api_secret: String = String::new(),
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub rate_limits: RateLimitConfig,
    pub price_providers: PriceProviderConfig,
    pub loaders: LoaderConfig,
}
