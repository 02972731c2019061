//! Pluggable registration validation policy
//!
//! The registry itself only enforces address uniqueness; everything else
//! (blacklists, license checks) is a policy decision that callers can swap.

use crate::types::Entity;

/// Outcome of a policy review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Registration may proceed
    Accept,
    /// Registration is rejected with a reason
    Reject(String),
}

/// Administrative validation policy applied to every registration request
pub trait RegistrationPolicy: Send + Sync {
    /// Review a candidate against the currently known entities
    fn review(&self, candidate: &Entity, existing: &[Entity]) -> PolicyDecision;
}

/// Default policy: rejects blacklisted locations and duplicate license numbers
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicy {
    /// Locations that may not register (case-insensitive substring match)
    pub blacklisted_locations: Vec<String>,
}

impl DefaultPolicy {
    /// Create policy with a location blacklist
    pub fn new(blacklisted_locations: Vec<String>) -> Self {
        Self {
            blacklisted_locations,
        }
    }
}

impl RegistrationPolicy for DefaultPolicy {
    fn review(&self, candidate: &Entity, existing: &[Entity]) -> PolicyDecision {
        let location = candidate.location.to_lowercase();
        for blacklisted in &self.blacklisted_locations {
            if location.contains(&blacklisted.to_lowercase()) {
                return PolicyDecision::Reject(format!(
                    "Location {} is blacklisted",
                    candidate.location
                ));
            }
        }

        let duplicate = existing.iter().any(|e| {
            e.is_registered()
                && e.license_number == candidate.license_number
                && e.address != candidate.address
        });
        if duplicate {
            return PolicyDecision::Reject(format!(
                "License number {} already in use",
                candidate.license_number
            ));
        }

        PolicyDecision::Accept
    }
}
