//! Core types for the provenance ledger
//!
//! All types serialize deterministically with bincode for storage. Weights
//! are integer points (1 carat = 100 points); amounts never use floats.

use chrono::{DateTime, Utc};
use entity_registry::{EntityAddress, EntityRole};
use serde::{Deserialize, Serialize};

/// Diamond record identifier (monotonic, assigned by the single writer)
pub type DiamondId = u64;

/// Listing identifier (monotonic, assigned by the single writer)
pub type ListingId = u64;

/// Raw or processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DiamondKind {
    /// Created directly from mining
    Raw = 1,
    /// Derived from one or more source records via manufacturing
    Processed = 2,
}

/// Certification state of a record. Certification is terminal: once
/// Certified, a record is never re-certified or decertified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationStatus {
    /// No attestation attached
    Uncertified,
    /// Immutable attestation from a certifier
    Certified {
        /// Certificate identifier (e.g. "GIA-12-...")
        certification_id: String,
        /// Attesting certifier
        certifier: EntityAddress,
    },
}

/// Lineage from a processed record back to its sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceLink {
    /// Records consumed to produce this one
    pub source_ids: Vec<DiamondId>,
    /// Entity that performed the processing
    pub manufacturer: EntityAddress,
}

/// One diamond record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondRecord {
    /// Unique id
    pub id: DiamondId,

    /// Raw or processed
    pub kind: DiamondKind,

    /// Mine or processing origin
    pub origin: String,

    /// Extraction date (raw) or inherited from the first source (processed)
    pub extracted_at: DateTime<Utc>,

    /// Weight in points (1 carat = 100 points), always positive
    pub weight: u64,

    /// Free-text physical description
    pub characteristics: String,

    /// Current owner; changes only through transfer or completed sale
    pub owner: EntityAddress,

    /// Certification state
    pub certification: CertificationStatus,

    /// Lineage; `None` for raw records
    pub provenance: Option<ProvenanceLink>,

    /// Set once the record is consumed by processing; consumed records are
    /// terminal and cannot be transferred, listed, or sold
    pub consumed: bool,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl DiamondRecord {
    /// True iff an attestation is attached
    pub fn is_certified(&self) -> bool {
        matches!(self.certification, CertificationStatus::Certified { .. })
    }
}

/// Marketplace listing. Terminal listings (cancelled or completed) are kept
/// for history; relisting a diamond creates a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique id
    pub id: ListingId,

    /// Diamond offered for sale
    pub diamond_id: DiamondId,

    /// Owner at listing time
    pub seller: EntityAddress,

    /// False once cancelled or completed
    pub active: bool,

    /// When the listing was created
    pub created_at: DateTime<Utc>,
}

/// A theft claim against a diamond. The diamond's stolen flag is derived:
/// it is true iff at least one unresolved report exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StolenReport {
    /// Reported diamond
    pub diamond_id: DiamondId,

    /// Reporting identity
    pub reporter: EntityAddress,

    /// When the report was filed
    pub reported_at: DateTime<Utc>,

    /// Free-text details
    pub details: String,

    /// Set on resolution
    pub resolved: bool,

    /// Resolving authority, set only on resolution
    pub resolver: Option<EntityAddress>,
}

/// Read-only projection of a diamond's current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondDetails {
    /// Diamond id
    pub diamond_id: DiamondId,
    /// Current owner
    pub owner: EntityAddress,
    /// True iff an active listing exists
    pub listed: bool,
    /// True iff an unresolved stolen report exists
    pub stolen: bool,
    /// Raw or processed
    pub kind: DiamondKind,
    /// Origin
    pub origin: String,
    /// Extraction date
    pub extracted_at: DateTime<Utc>,
    /// Weight in points
    pub weight: u64,
    /// Physical description
    pub characteristics: String,
    /// Certification state
    pub certification: CertificationStatus,
    /// Consumed by processing
    pub consumed: bool,
}

/// Primary notification event, one per successful mutation
/// (`DiamondProcessed`: one per consumed source)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Entity accepted into the registry
    EntityRegistered {
        /// Registered address
        address: EntityAddress,
        /// Display name
        name: String,
        /// Granted role
        role: EntityRole,
        /// License number
        license_number: String,
    },
    /// Registration rejected by policy
    RegistrationRejected {
        /// Candidate name
        name: String,
        /// Candidate location
        location: String,
        /// Policy reason
        reason: String,
    },
    /// Raw diamond entered the ledger
    DiamondRegistered {
        /// New record id
        diamond_id: DiamondId,
        /// Registering miner
        miner: EntityAddress,
        /// Mine origin
        origin: String,
        /// Weight in points
        weight: u64,
    },
    /// A source record was consumed into a new processed record
    DiamondProcessed {
        /// Consumed source
        raw_diamond_id: DiamondId,
        /// Resulting processed record
        new_diamond_id: DiamondId,
        /// Processing manufacturer
        manufacturer: EntityAddress,
    },
    /// Attestation attached
    DiamondCertified {
        /// Certified diamond
        diamond_id: DiamondId,
        /// Attesting certifier
        certifier: EntityAddress,
        /// Certificate identifier
        certification_id: String,
    },
    /// Custody moved outside the marketplace
    DiamondTransferred {
        /// Transferred diamond
        diamond_id: DiamondId,
        /// Previous owner
        from: EntityAddress,
        /// New owner
        to: EntityAddress,
        /// Caller-supplied transfer label (e.g. "sale", "consignment")
        transfer_type: String,
    },
    /// Listing created
    DiamondListed {
        /// New listing id
        listing_id: ListingId,
        /// Listed diamond
        diamond_id: DiamondId,
        /// Seller (owner at listing time)
        seller: EntityAddress,
    },
    /// Listing cancelled by its seller
    ListingCancelled {
        /// Cancelled listing
        listing_id: ListingId,
        /// Listed diamond
        diamond_id: DiamondId,
        /// Seller
        seller: EntityAddress,
    },
    /// Sale completed: listing closed and ownership moved atomically
    DiamondSold {
        /// Completed listing
        listing_id: ListingId,
        /// Sold diamond
        diamond_id: DiamondId,
        /// New owner
        buyer: EntityAddress,
    },
    /// Theft report filed
    DiamondReportedStolen {
        /// Reported diamond
        diamond_id: DiamondId,
        /// Reporting identity
        reporter: EntityAddress,
        /// Free-text details
        details: String,
    },
    /// All open reports for the diamond resolved
    StolenReportResolved {
        /// Diamond whose reports were resolved
        diamond_id: DiamondId,
        /// Resolving authority
        resolver: EntityAddress,
    },
}

impl LedgerEvent {
    /// Event name as surfaced to collaborators
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::EntityRegistered { .. } => "EntityRegistered",
            LedgerEvent::RegistrationRejected { .. } => "RegistrationRejected",
            LedgerEvent::DiamondRegistered { .. } => "DiamondRegistered",
            LedgerEvent::DiamondProcessed { .. } => "DiamondProcessed",
            LedgerEvent::DiamondCertified { .. } => "DiamondCertified",
            LedgerEvent::DiamondTransferred { .. } => "DiamondTransferred",
            LedgerEvent::DiamondListed { .. } => "DiamondListed",
            LedgerEvent::ListingCancelled { .. } => "ListingCancelled",
            LedgerEvent::DiamondSold { .. } => "DiamondSold",
            LedgerEvent::DiamondReportedStolen { .. } => "DiamondReportedStolen",
            LedgerEvent::StolenReportResolved { .. } => "StolenReportResolved",
        }
    }

    /// Diamond ids this event touches, used for the per-diamond history index
    pub fn diamond_ids(&self) -> Vec<DiamondId> {
        match self {
            LedgerEvent::EntityRegistered { .. } | LedgerEvent::RegistrationRejected { .. } => {
                vec![]
            }
            LedgerEvent::DiamondRegistered { diamond_id, .. }
            | LedgerEvent::DiamondCertified { diamond_id, .. }
            | LedgerEvent::DiamondTransferred { diamond_id, .. }
            | LedgerEvent::DiamondListed { diamond_id, .. }
            | LedgerEvent::ListingCancelled { diamond_id, .. }
            | LedgerEvent::DiamondSold { diamond_id, .. }
            | LedgerEvent::DiamondReportedStolen { diamond_id, .. }
            | LedgerEvent::StolenReportResolved { diamond_id, .. } => vec![*diamond_id],
            LedgerEvent::DiamondProcessed {
                raw_diamond_id,
                new_diamond_id,
                ..
            } => vec![*raw_diamond_id, *new_diamond_id],
        }
    }
}

/// Persisted event envelope: position in the total order plus wall time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the append-only log
    pub seq: u64,

    /// Wall-clock time at commit
    pub recorded_at: DateTime<Utc>,

    /// The event itself
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_diamond_ids() {
        let event = LedgerEvent::DiamondProcessed {
            raw_diamond_id: 1,
            new_diamond_id: 2,
            manufacturer: EntityAddress::new("0xmfg"),
        };
        assert_eq!(event.diamond_ids(), vec![1, 2]);

        let event = LedgerEvent::RegistrationRejected {
            name: "x".to_string(),
            location: "y".to_string(),
            reason: "z".to_string(),
        };
        assert!(event.diamond_ids().is_empty());
    }

    #[test]
    fn test_event_names() {
        let event = LedgerEvent::DiamondSold {
            listing_id: 1,
            diamond_id: 2,
            buyer: EntityAddress::new("0xbuyer"),
        };
        assert_eq!(event.name(), "DiamondSold");
    }

    #[test]
    fn test_record_is_certified() {
        let mut record = DiamondRecord {
            id: 1,
            kind: DiamondKind::Raw,
            origin: "Jwaneng, Botswana".to_string(),
            extracted_at: Utc::now(),
            weight: 150,
            characteristics: "octahedral crystal".to_string(),
            owner: EntityAddress::new("0xminer"),
            certification: CertificationStatus::Uncertified,
            provenance: None,
            consumed: false,
            created_at: Utc::now(),
        };
        assert!(!record.is_certified());

        record.certification = CertificationStatus::Certified {
            certification_id: "GIA-1".to_string(),
            certifier: EntityAddress::new("0xcert"),
        };
        assert!(record.is_certified());
    }
}
