//! Error types for the entity registry

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Registry errors
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// Address already holds a non-Rejected registration
    #[error("Entity already registered: {0}")]
    AlreadyRegistered(String),

    /// Malformed registration input
    #[error("Invalid registration input: {0}")]
    InvalidInput(String),
}
