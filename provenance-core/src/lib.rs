//! GemTrace Provenance Core
//!
//! Append-only provenance-and-marketplace ledger for diamond records.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task applies every state transition,
//!   giving a total order over mutations
//! - **Atomic Transitions**: all invariant checks run against current state
//!   and every multi-key mutation commits in one RocksDB write batch
//! - **Event Log**: each successful transition appends exactly one primary
//!   event to an append-only log and publishes it to subscribers
//! - **Derived Flags**: the stolen flag is always computed from the report
//!   log, never cached

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{
    CertificationStatus, DiamondDetails, DiamondId, DiamondKind, DiamondRecord, EventRecord,
    LedgerEvent, Listing, ListingId, ProvenanceLink, StolenReport,
};
