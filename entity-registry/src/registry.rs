//! Address-keyed entity registry
//!
//! Fast concurrent lookup for the `is_authorized` precondition check that
//! every ledger transition performs. The authoritative copy lives here in
//! memory; the ledger persists snapshots alongside its own state and
//! restores them at open.

use crate::error::{Error, Result};
use crate::policy::{DefaultPolicy, PolicyDecision, RegistrationPolicy};
use crate::types::{Entity, EntityAddress, EntityRole, RegistrationStatus};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

/// Outcome of a registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Entity accepted and now Registered
    Registered(Entity),
    /// Entity recorded as Rejected by policy
    Rejected {
        /// Rejected record as stored
        entity: Entity,
        /// Policy reason
        reason: String,
    },
}

/// Entity registry with a pluggable validation policy
pub struct EntityRegistry {
    entities: DashMap<EntityAddress, Entity>,
    policy: Box<dyn RegistrationPolicy>,
}

impl EntityRegistry {
    /// Create registry with the default policy
    pub fn new() -> Self {
        Self::with_policy(Box::new(DefaultPolicy::default()))
    }

    /// Create registry with a custom policy
    pub fn with_policy(policy: Box<dyn RegistrationPolicy>) -> Self {
        Self {
            entities: DashMap::new(),
            policy,
        }
    }

    /// Review a registration request without recording it
    ///
    /// Fails with `AlreadyRegistered` if the address holds a non-Rejected
    /// record. Otherwise the policy decides between Registered and Rejected.
    /// Nothing is inserted; callers that persist entities externally commit
    /// the outcome with [`Self::commit_registration`] only once the write
    /// has succeeded, so a failed write leaves the registry untouched.
    pub fn review_registration(
        &self,
        address: EntityAddress,
        name: impl Into<String>,
        location: impl Into<String>,
        role: EntityRole,
        license_number: impl Into<String>,
    ) -> Result<RegistrationOutcome> {
        if let Some(existing) = self.entities.get(&address) {
            if existing.status != RegistrationStatus::Rejected {
                return Err(Error::AlreadyRegistered(address.to_string()));
            }
        }

        let candidate = Entity {
            address,
            name: name.into(),
            location: location.into(),
            role,
            license_number: license_number.into(),
            status: RegistrationStatus::Pending,
            registered_at: Utc::now(),
        };

        if candidate.name.is_empty() {
            return Err(Error::InvalidInput("Name must not be empty".to_string()));
        }

        let existing: Vec<Entity> = self.snapshot();
        let outcome = match self.policy.review(&candidate, &existing) {
            PolicyDecision::Accept => RegistrationOutcome::Registered(Entity {
                status: RegistrationStatus::Registered,
                ..candidate
            }),
            PolicyDecision::Reject(reason) => RegistrationOutcome::Rejected {
                entity: Entity {
                    status: RegistrationStatus::Rejected,
                    ..candidate
                },
                reason,
            },
        };

        Ok(outcome)
    }

    /// Record a reviewed outcome; both outcomes are kept (rejections for
    /// audit)
    pub fn commit_registration(&self, outcome: &RegistrationOutcome) {
        match outcome {
            RegistrationOutcome::Registered(entity) => {
                self.entities.insert(entity.address.clone(), entity.clone());
                info!(address = %entity.address, role = %entity.role, "Entity registered");
            }
            RegistrationOutcome::Rejected { entity, reason } => {
                self.entities.insert(entity.address.clone(), entity.clone());
                debug!(address = %entity.address, reason = %reason, "Registration rejected");
            }
        }
    }

    /// Review and record a registration in one step
    pub fn register(
        &self,
        address: EntityAddress,
        name: impl Into<String>,
        location: impl Into<String>,
        role: EntityRole,
        license_number: impl Into<String>,
    ) -> Result<RegistrationOutcome> {
        let outcome =
            self.review_registration(address, name, location, role, license_number)?;
        self.commit_registration(&outcome);
        Ok(outcome)
    }

    /// Get current entity record, if any
    pub fn get_entity_info(&self, address: &EntityAddress) -> Option<Entity> {
        self.entities.get(address).map(|e| e.clone())
    }

    /// Pure authorization predicate: Registered and holding the given role
    pub fn is_authorized(&self, address: &EntityAddress, role: EntityRole) -> bool {
        self.entities
            .get(address)
            .map(|e| e.is_registered() && e.role == role)
            .unwrap_or(false)
    }

    /// True iff the address holds a Registered record of any role
    pub fn is_registered(&self, address: &EntityAddress) -> bool {
        self.entities
            .get(address)
            .map(|e| e.is_registered())
            .unwrap_or(false)
    }

    /// All known entities (for persistence)
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities.iter().map(|e| e.value().clone()).collect()
    }

    /// Restore entities from a snapshot, replacing existing records
    pub fn restore(&self, entities: Vec<Entity>) {
        for entity in entities {
            self.entities.insert(entity.address.clone(), entity);
        }
    }

    /// Number of known entities (including rejected)
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True iff no entities are known
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
