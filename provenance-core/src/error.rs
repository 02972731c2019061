//! Error types for the provenance ledger
//!
//! Every failed transition maps to one specific variant; `Error::kind`
//! classifies variants into the coarse taxonomy surfaced to collaborators.

use crate::types::{DiamondId, ListingId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classification surfaced with every error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the required role or ownership
    Unauthorized,
    /// Referenced entity, diamond, listing, or report is absent
    NotFound,
    /// Malformed parameters
    InvalidInput,
    /// Violates a uniqueness or exclusivity invariant
    Conflict,
    /// State-dependent rule violated
    PreconditionFailed,
    /// Storage, serialization, or concurrency failure
    Internal,
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Diamond record not found
    #[error("Diamond not found: {0}")]
    DiamondNotFound(DiamondId),

    /// Listing not found
    #[error("Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// No unresolved stolen report for the diamond
    #[error("No open stolen report for diamond {0}")]
    NoOpenReports(DiamondId),

    /// Referenced entity holds no Registered record
    #[error("Entity not registered: {0}")]
    EntityNotRegistered(String),

    /// Weight must be positive
    #[error("Invalid weight: {0}")]
    InvalidWeight(u64),

    /// Malformed parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller does not own the diamond
    #[error("Entity {caller} does not own diamond {diamond_id}")]
    NotOwner {
        /// Diamond in question
        diamond_id: DiamondId,
        /// Caller address
        caller: String,
    },

    /// Raw record was already consumed by processing
    #[error("Diamond {0} was already consumed by processing")]
    AlreadyConsumed(DiamondId),

    /// Diamond already has an active listing
    #[error("Diamond {0} is already listed")]
    AlreadyListed(DiamondId),

    /// Diamond already carries a certification
    #[error("Diamond {0} is already certified")]
    AlreadyCertified(DiamondId),

    /// Active listing freezes transfers outside the marketplace path
    #[error("Diamond {0} has an active listing")]
    DiamondListed(DiamondId),

    /// Unresolved stolen report blocks the operation
    #[error("Diamond {0} is reported stolen")]
    DiamondStolen(DiamondId),

    /// Listing is no longer active
    #[error("Listing {0} is not active")]
    ListingNotActive(ListingId),

    /// Caller is not the listing's seller
    #[error("Entity {caller} is not the seller of listing {listing_id}")]
    NotSeller {
        /// Listing in question
        listing_id: ListingId,
        /// Caller address
        caller: String,
    },

    /// Seller no longer owns the diamond (stale listing)
    #[error("Seller of listing {listing_id} no longer owns diamond {diamond_id}")]
    OwnerMismatch {
        /// Stale listing
        listing_id: ListingId,
        /// Diamond whose ownership moved
        diamond_id: DiamondId,
    },

    /// Entity registry error
    #[error("Registry error: {0}")]
    Registry(#[from] entity_registry::Error),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify into the coarse error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized(_) | Error::NotOwner { .. } | Error::NotSeller { .. } => {
                ErrorKind::Unauthorized
            }
            Error::DiamondNotFound(_) | Error::ListingNotFound(_) | Error::NoOpenReports(_) => {
                ErrorKind::NotFound
            }
            Error::InvalidWeight(_) | Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::AlreadyConsumed(_) | Error::AlreadyListed(_) | Error::AlreadyCertified(_) => {
                ErrorKind::Conflict
            }
            Error::EntityNotRegistered(_)
            | Error::DiamondListed(_)
            | Error::DiamondStolen(_)
            | Error::ListingNotActive(_)
            | Error::OwnerMismatch { .. } => ErrorKind::PreconditionFailed,
            Error::Registry(entity_registry::Error::AlreadyRegistered(_)) => ErrorKind::Conflict,
            Error::Registry(entity_registry::Error::InvalidInput(_)) => ErrorKind::InvalidInput,
            Error::Storage(_)
            | Error::Serialization(_)
            | Error::Concurrency(_)
            | Error::Config(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
