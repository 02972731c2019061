//! Entity Registry for GemTrace
//!
//! Maps participant addresses to their role and metadata, and gate-keeps
//! which identities may submit which ledger transitions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod policy;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use policy::{DefaultPolicy, PolicyDecision, RegistrationPolicy};
pub use registry::{EntityRegistry, RegistrationOutcome};
pub use types::{Entity, EntityAddress, EntityRole, RegistrationStatus};
