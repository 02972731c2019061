//! Core types for the entity registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address-like identity of a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityAddress(String);

impl EntityAddress {
    /// Create new address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Role of a registered participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityRole {
    /// Mines raw diamonds
    Miner = 1,
    /// Cuts and polishes raw diamonds into processed ones
    Manufacturer = 2,
    /// Issues certification attestations
    Certifier = 3,
    /// Sells diamonds to end buyers
    Retailer = 4,
    /// Any other participant (buyers, auditors, ...)
    Other = 5,
}

impl EntityRole {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityRole::Miner => "Miner",
            EntityRole::Manufacturer => "Manufacturer",
            EntityRole::Certifier => "Certifier",
            EntityRole::Retailer => "Retailer",
            EntityRole::Other => "Other",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Miner" => Some(EntityRole::Miner),
            "Manufacturer" => Some(EntityRole::Manufacturer),
            "Certifier" => Some(EntityRole::Certifier),
            "Retailer" => Some(EntityRole::Retailer),
            "Other" => Some(EntityRole::Other),
            _ => None,
        }
    }
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RegistrationStatus {
    /// Registration submitted, not yet decided
    Pending = 1,
    /// Accepted; entity may act under its role
    Registered = 2,
    /// Rejected by policy; address may re-register
    Rejected = 3,
}

/// A registered (or rejected) participant. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique address
    pub address: EntityAddress,

    /// Display name
    pub name: String,

    /// Physical location
    pub location: String,

    /// Role
    pub role: EntityRole,

    /// License number
    pub license_number: String,

    /// Registration status
    pub status: RegistrationStatus,

    /// When the registration was recorded
    pub registered_at: DateTime<Utc>,
}

impl Entity {
    /// True iff the entity is in the Registered state
    pub fn is_registered(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}
