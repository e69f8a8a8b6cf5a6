use std::fmt;
use thiserror::Error;

pub mod verdict_report;
pub mod wallet_store;

pub use verdict_report::{VerdictReport, VerdictRow, VERDICT_REPORT_FILE};
pub use wallet_store::WalletStore;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// The three line-delimited wallet files a run produces, one per stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletList {
    /// Every discovered candidate
    Candidates,
    /// Passed the profitability thresholds
    Profitable,
    /// Profitable, recently active and not sniping
    Qualified,
}

impl WalletList {
    pub fn file_name(&self) -> &'static str {
        match self {
            WalletList::Candidates => "potential_wallets.txt",
            WalletList::Profitable => "profitable_and_winning_wallets.txt",
            WalletList::Qualified => "profitable_and_winning_and_not_sniping_wallets.txt",
        }
    }
}

impl fmt::Display for WalletList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletList::Candidates => write!(f, "candidates"),
            WalletList::Profitable => write!(f, "profitable"),
            WalletList::Qualified => write!(f, "qualified"),
        }
    }
}
