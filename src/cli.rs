//! Operator CLI surface (spec §6.5) — manual smoke-testing against a
//! local SQLite store, not a production control plane.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ledger-engine", about = "Crypto accounting ledger & tax engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) logging for all tags.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress info-level logging; only warnings and errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable debug logging for specific tags only (repeatable).
    #[arg(long = "debug-tag", global = true)]
    pub debug_tags: Vec<String>,

    /// Enable verbose logging for specific tags only (repeatable).
    #[arg(long = "verbose-tag", global = true)]
    pub verbose_tags: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load new transactions for an EVM wallet via Etherscan-v2.
    LoadEvm {
        #[arg(long)]
        entity: String,
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        chain: String,
    },

    /// Load new transactions for a Solana wallet via JSON-RPC.
    LoadSolana {
        #[arg(long)]
        entity: String,
        #[arg(long)]
        wallet: String,
    },

    /// Import a Binance Transaction History CSV export.
    ImportBinanceCsv {
        #[arg(long)]
        entity: String,
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Parse every loaded transaction for an entity's wallets into
    /// journal entries.
    Process {
        #[arg(long)]
        entity: String,
    },

    /// Run FIFO capital-gains + Vietnam transfer-tax calculation over
    /// a date range.
    Tax {
        #[arg(long)]
        entity: String,
        /// Inclusive period start, RFC 3339 (e.g. `2024-01-01T00:00:00Z`).
        #[arg(long)]
        start: String,
        /// Inclusive period end, RFC 3339.
        #[arg(long)]
        end: String,
        /// USD/VND exchange rate used to convert transfer values.
        #[arg(long, default_value = "25000")]
        usd_vnd_rate: String,
        /// VND value above which a single transfer is tax-exempt.
        #[arg(long, default_value = "20000000")]
        exemption_threshold_vnd: String,
    },
}
