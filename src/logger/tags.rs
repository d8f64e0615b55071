/// Module-scoped log categories. Gates `Debug`/`Verbose` output
/// independently per subsystem via `--debug-<tag>` / `--verbose-<tag>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Extractor,
    Context,
    Parser,
    AccountMapper,
    Bookkeeper,
    Pricing,
    TaxEngine,
    EvmLoader,
    SolanaLoader,
    CexLoader,
    Storage,
}

impl LogTag {
    /// The key used for `--debug-<key>` / `--verbose-<key>` matching
    /// and for the `enabled_tags` allowlist.
    pub fn to_debug_key(self) -> String {
        match self {
            LogTag::Extractor => "extractor",
            LogTag::Context => "context",
            LogTag::Parser => "parser",
            LogTag::AccountMapper => "account-mapper",
            LogTag::Bookkeeper => "bookkeeper",
            LogTag::Pricing => "pricing",
            LogTag::TaxEngine => "tax-engine",
            LogTag::EvmLoader => "evm-loader",
            LogTag::SolanaLoader => "solana-loader",
            LogTag::CexLoader => "cex-loader",
            LogTag::Storage => "storage",
        }
        .to_string()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogTag::Extractor => "EXTRACTOR",
            LogTag::Context => "CONTEXT",
            LogTag::Parser => "PARSER",
            LogTag::AccountMapper => "ACCOUNT_MAPPER",
            LogTag::Bookkeeper => "BOOKKEEPER",
            LogTag::Pricing => "PRICING",
            LogTag::TaxEngine => "TAX_ENGINE",
            LogTag::EvmLoader => "EVM_LOADER",
            LogTag::SolanaLoader => "SOLANA_LOADER",
            LogTag::CexLoader => "CEX_LOADER",
            LogTag::Storage => "STORAGE",
        }
    }
}
