//! Ledger errors

use crate::hash::ChainError;
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The chain failed verification. Fatal: no further appends are accepted.
    #[error("Ledger integrity violated: {0}")]
    Integrity(ChainError),

    #[error("Failed to serialize record: {0}")]
    Serialization(String),

    #[error("Failed to export ledger: {0}")]
    Export(String),
}

impl LedgerError {
    /// True if this error means the chain can no longer be trusted
    pub fn is_integrity(&self) -> bool {
        matches!(self, LedgerError::Integrity(_))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Export(e.to_string())
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
