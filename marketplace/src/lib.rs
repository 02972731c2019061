//! GemTrace Marketplace
//!
//! Listing, sale, and stolen-report front-end over the provenance ledger.
//! The engine adds the authority layer (who may complete sales, who may
//! resolve theft reports); all state lives in the ledger and every
//! transition is validated and committed there.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;

pub use config::{Config, SaleAuthority};
pub use engine::MarketplaceEngine;
pub use error::{Error, Result};
