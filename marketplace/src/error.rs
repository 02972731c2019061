//! Error types for the marketplace engine

use provenance_core::ErrorKind;
use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks the configured authority
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] provenance_core::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify into the shared error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Ledger(inner) => inner.kind(),
            Error::Config(_) => ErrorKind::Internal,
        }
    }
}
