use thiserror::Error;

/// Unified error type for the engine. Parse-level failures
/// (`UnknownTransactionInput`, `BalanceError`, `TxParseError`) are
/// recorded as `ParseErrorRecord`s rather than propagated — see
/// `bookkeeper` — so most call sites only ever see the
/// infrastructure variants below bubble up through `?`.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("no parser produced splits for tx {tx_hash}")]
    UnknownTransactionInput { tx_hash: String },

    #[error("journal entry does not balance ({entry_description}): {detail}")]
    BalanceError {
        entry_description: String,
        detail: String,
    },

    #[error("parser failed on tx {tx_hash}: {source}")]
    TxParseError {
        tx_hash: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("external service error ({provider}): {detail}")]
    ExternalService { provider: String, detail: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::ExternalService { .. } | LedgerError::Http(_)
        )
    }

    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            LedgerError::ExternalService { .. } => Some(30),
            LedgerError::Http(_) => Some(5),
            _ => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
