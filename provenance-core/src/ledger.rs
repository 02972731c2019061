//! Public ledger facade
//!
//! [`Ledger`] owns the storage, the participant registry, and the
//! single-writer actor. Mutations go through the actor mailbox; queries read
//! committed state directly.

use crate::actor::{spawn_ledger_actor, LedgerHandle};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::types::{
    DiamondDetails, DiamondId, DiamondRecord, EventRecord, Listing, ListingId, StolenReport,
};
use crate::{Config, Storage};
use chrono::{DateTime, Utc};
use entity_registry::{
    DefaultPolicy, Entity, EntityAddress, EntityRegistry, EntityRole, RegistrationOutcome,
    RegistrationPolicy,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Provenance-and-marketplace ledger
pub struct Ledger {
    storage: Arc<Storage>,
    registry: Arc<EntityRegistry>,
    handle: LedgerHandle,
    events: broadcast::Sender<EventRecord>,
    metrics: Arc<Metrics>,
}

impl Ledger {
    /// Open the ledger with the default registration policy, configured with
    /// the blacklisted locations from `config`
    pub fn open(config: &Config) -> Result<Self> {
        let policy = DefaultPolicy::new(config.blacklisted_locations.clone());
        Self::open_with_policy(config, Box::new(policy))
    }

    /// Open the ledger with a custom registration policy
    pub fn open_with_policy(
        config: &Config,
        policy: Box<dyn RegistrationPolicy>,
    ) -> Result<Self> {
        let storage = Arc::new(Storage::open(config)?);

        let registry = Arc::new(EntityRegistry::with_policy(policy));
        let entities = storage.load_entities()?;
        if !entities.is_empty() {
            tracing::info!(count = entities.len(), "Restoring entity registry");
            registry.restore(entities);
        }

        let metrics = Arc::new(Metrics::new()?);
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        let handle = spawn_ledger_actor(
            storage.clone(),
            registry.clone(),
            events.clone(),
            metrics.clone(),
        )?;

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            "Ledger open"
        );

        Ok(Self {
            storage,
            registry,
            handle,
            events,
            metrics,
        })
    }

    /// Subscribe to the event stream. Subscribers that fall behind the
    /// channel capacity observe a lag error, never a stalled writer.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Metrics handle
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Stop the writer task. Queries keep working; mutations fail once the
    /// mailbox closes.
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    // Mutations (serialized through the actor)

    /// Register a participant
    pub async fn register_entity(
        &self,
        address: EntityAddress,
        name: impl Into<String>,
        location: impl Into<String>,
        role: EntityRole,
        license_number: impl Into<String>,
    ) -> Result<RegistrationOutcome> {
        self.handle
            .register_entity(address, name, location, role, license_number)
            .await
    }

    /// Register a raw diamond; Miner role required
    pub async fn register_raw_diamond(
        &self,
        miner: EntityAddress,
        origin: impl Into<String>,
        extracted_at: DateTime<Utc>,
        weight: u64,
        characteristics: impl Into<String>,
    ) -> Result<DiamondId> {
        self.handle
            .register_raw_diamond(miner, origin, extracted_at, weight, characteristics)
            .await
    }

    /// Consume owned source records into a new processed record; Manufacturer
    /// role required
    pub async fn process_diamond(
        &self,
        manufacturer: EntityAddress,
        source_ids: Vec<DiamondId>,
        new_origin: Option<String>,
        new_weight: u64,
        characteristics: impl Into<String>,
    ) -> Result<DiamondId> {
        self.handle
            .process_diamond(manufacturer, source_ids, new_origin, new_weight, characteristics)
            .await
    }

    /// Move custody outside the marketplace
    pub async fn transfer(
        &self,
        from: EntityAddress,
        to: EntityAddress,
        diamond_id: DiamondId,
        transfer_type: impl Into<String>,
    ) -> Result<()> {
        self.handle.transfer(from, to, diamond_id, transfer_type).await
    }

    /// Attach an attestation; Certifier role required, terminal
    pub async fn certify(
        &self,
        certifier: EntityAddress,
        diamond_id: DiamondId,
        certification_id: impl Into<String>,
    ) -> Result<()> {
        self.handle.certify(certifier, diamond_id, certification_id).await
    }

    /// Create a listing for an owned, unlisted, unstolen diamond
    pub async fn list_diamond(
        &self,
        seller: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<ListingId> {
        self.handle.list_diamond(seller, diamond_id).await
    }

    /// Cancel an active listing; seller only
    pub async fn cancel_listing(
        &self,
        caller: EntityAddress,
        listing_id: ListingId,
    ) -> Result<()> {
        self.handle.cancel_listing(caller, listing_id).await
    }

    /// Complete a sale: close the listing and move ownership atomically.
    /// Callers are expected to enforce sale authority before invoking this.
    pub async fn complete_sale(&self, listing_id: ListingId, buyer: EntityAddress) -> Result<()> {
        self.handle.complete_sale(listing_id, buyer).await
    }

    /// File a theft report
    pub async fn report_stolen(
        &self,
        reporter: EntityAddress,
        diamond_id: DiamondId,
        details: impl Into<String>,
    ) -> Result<()> {
        self.handle.report_stolen(reporter, diamond_id, details).await
    }

    /// Resolve all open reports for a diamond; returns the count resolved
    pub async fn resolve_reports(
        &self,
        resolver: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<usize> {
        self.handle.resolve_reports(resolver, diamond_id).await
    }

    // Queries (read committed state directly)

    /// Raw record as stored
    pub fn get_diamond(&self, diamond_id: DiamondId) -> Result<DiamondRecord> {
        self.storage.get_diamond(diamond_id)
    }

    /// Current-state projection: record fields plus the derived listed and
    /// stolen flags
    pub fn get_diamond_details(&self, diamond_id: DiamondId) -> Result<DiamondDetails> {
        let record = self.storage.get_diamond(diamond_id)?;
        let listed = self.storage.active_listing_id(diamond_id)?.is_some();
        let stolen = self.storage.is_diamond_stolen(diamond_id)?;

        Ok(DiamondDetails {
            diamond_id: record.id,
            owner: record.owner,
            listed,
            stolen,
            kind: record.kind,
            origin: record.origin,
            extracted_at: record.extracted_at,
            weight: record.weight,
            characteristics: record.characteristics,
            certification: record.certification,
            consumed: record.consumed,
        })
    }

    /// Full event history touching a diamond, in ledger order
    pub fn get_diamond_history(&self, diamond_id: DiamondId) -> Result<Vec<EventRecord>> {
        // Missing records have an empty history; distinguish them
        self.storage.get_diamond(diamond_id)?;
        self.storage.get_diamond_history(diamond_id)
    }

    /// Total number of records ever created, consumed ones included
    pub fn total_diamonds(&self) -> Result<u64> {
        self.storage.max_diamond_id()
    }

    /// Listing by id, active or historical
    pub fn get_listing_details(&self, listing_id: ListingId) -> Result<Listing> {
        self.storage.get_listing(listing_id)
    }

    /// All currently active listings
    pub fn get_active_listings(&self) -> Result<Vec<Listing>> {
        self.storage.get_active_listings()
    }

    /// All reports ever filed for a diamond, in filing order
    pub fn get_stolen_reports(&self, diamond_id: DiamondId) -> Result<Vec<StolenReport>> {
        self.storage.get_stolen_reports(diamond_id)
    }

    /// Derived stolen flag
    pub fn is_diamond_stolen(&self, diamond_id: DiamondId) -> Result<bool> {
        self.storage.is_diamond_stolen(diamond_id)
    }

    /// Current entity record, if any
    pub fn get_entity_info(&self, address: &EntityAddress) -> Option<Entity> {
        self.registry.get_entity_info(address)
    }

    /// Registered and holding the given role
    pub fn is_authorized(&self, address: &EntityAddress, role: EntityRole) -> bool {
        self.registry.is_authorized(address, role)
    }
}
