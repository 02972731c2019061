//! Single-writer actor for the ledger
//!
//! One task applies every state transition, which gives a total order over
//! mutations and lets each handler validate preconditions against fully
//! committed state. Handlers check everything first, then commit one write
//! batch, then publish the event. A failed command writes nothing.
//!
//! Reads that need no ordering guarantee go straight to storage via
//! [`crate::Ledger`] and never pass through the mailbox.

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::types::{
    CertificationStatus, DiamondId, DiamondKind, DiamondRecord, EventRecord, LedgerEvent, Listing,
    ListingId, ProvenanceLink, StolenReport,
};
use crate::Storage;
use chrono::{DateTime, Utc};
use entity_registry::{EntityAddress, EntityRegistry, EntityRole, RegistrationOutcome};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Register a participant
    RegisterEntity {
        /// Candidate address
        address: EntityAddress,
        /// Display name
        name: String,
        /// Location
        location: String,
        /// Requested role
        role: EntityRole,
        /// License number
        license_number: String,
        /// Reply channel
        response: oneshot::Sender<Result<RegistrationOutcome>>,
    },

    /// Register a raw diamond
    RegisterRawDiamond {
        /// Registering miner
        miner: EntityAddress,
        /// Mine origin
        origin: String,
        /// Extraction date
        extracted_at: DateTime<Utc>,
        /// Weight in points
        weight: u64,
        /// Physical description
        characteristics: String,
        /// Reply channel
        response: oneshot::Sender<Result<DiamondId>>,
    },

    /// Consume source records into a new processed record
    ProcessDiamond {
        /// Processing manufacturer
        manufacturer: EntityAddress,
        /// Records to consume
        source_ids: Vec<DiamondId>,
        /// Origin of the new record; defaults to the first source's origin
        new_origin: Option<String>,
        /// Weight of the new record in points
        new_weight: u64,
        /// Physical description of the new record
        characteristics: String,
        /// Reply channel
        response: oneshot::Sender<Result<DiamondId>>,
    },

    /// Move custody outside the marketplace
    Transfer {
        /// Current owner
        from: EntityAddress,
        /// New owner
        to: EntityAddress,
        /// Diamond to transfer
        diamond_id: DiamondId,
        /// Caller-supplied transfer label
        transfer_type: String,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Attach an attestation
    Certify {
        /// Attesting certifier
        certifier: EntityAddress,
        /// Diamond to certify
        diamond_id: DiamondId,
        /// Certificate identifier
        certification_id: String,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Create a listing
    ListDiamond {
        /// Seller (must own the diamond)
        seller: EntityAddress,
        /// Diamond to list
        diamond_id: DiamondId,
        /// Reply channel
        response: oneshot::Sender<Result<ListingId>>,
    },

    /// Cancel an active listing
    CancelListing {
        /// Caller (must be the seller)
        caller: EntityAddress,
        /// Listing to cancel
        listing_id: ListingId,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Complete a sale: close the listing and move ownership atomically.
    /// Authority over who may call this lives in the marketplace engine.
    CompleteSale {
        /// Listing to complete
        listing_id: ListingId,
        /// New owner
        buyer: EntityAddress,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// File a theft report
    ReportStolen {
        /// Reporting identity
        reporter: EntityAddress,
        /// Reported diamond
        diamond_id: DiamondId,
        /// Free-text details
        details: String,
        /// Reply channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Resolve all open reports for a diamond
    ResolveReports {
        /// Resolving authority
        resolver: EntityAddress,
        /// Diamond whose reports to resolve
        diamond_id: DiamondId,
        /// Reply channel, carries the number of reports resolved
        response: oneshot::Sender<Result<usize>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that applies ledger transitions
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Participant registry (authoritative in-memory copy)
    registry: Arc<EntityRegistry>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Event stream publisher
    events: broadcast::Sender<EventRecord>,

    /// Metrics
    metrics: Arc<Metrics>,

    /// Next diamond id
    next_diamond_id: DiamondId,

    /// Next listing id
    next_listing_id: ListingId,

    /// Next event sequence
    next_event_seq: u64,
}

impl LedgerActor {
    /// Create new actor, restoring id counters from storage
    pub fn new(
        storage: Arc<Storage>,
        registry: Arc<EntityRegistry>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        events: broadcast::Sender<EventRecord>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let next_diamond_id = storage.max_diamond_id()? + 1;
        let next_listing_id = storage.max_listing_id()? + 1;
        let next_event_seq = storage.max_event_seq()? + 1;

        Ok(Self {
            storage,
            registry,
            mailbox,
            events,
            metrics,
            next_diamond_id,
            next_listing_id,
            next_event_seq,
        })
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, LedgerMessage::Shutdown) {
                break;
            }
            self.handle_message(msg);
        }
        tracing::info!("Ledger actor stopped");
    }

    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::RegisterEntity {
                address,
                name,
                location,
                role,
                license_number,
                response,
            } => {
                let result = self.register_entity(address, name, location, role, license_number);
                let _ = response.send(result);
            }

            LedgerMessage::RegisterRawDiamond {
                miner,
                origin,
                extracted_at,
                weight,
                characteristics,
                response,
            } => {
                let result =
                    self.register_raw_diamond(miner, origin, extracted_at, weight, characteristics);
                let _ = response.send(result);
            }

            LedgerMessage::ProcessDiamond {
                manufacturer,
                source_ids,
                new_origin,
                new_weight,
                characteristics,
                response,
            } => {
                let result = self.process_diamond(
                    manufacturer,
                    source_ids,
                    new_origin,
                    new_weight,
                    characteristics,
                );
                let _ = response.send(result);
            }

            LedgerMessage::Transfer {
                from,
                to,
                diamond_id,
                transfer_type,
                response,
            } => {
                let result = self.transfer(from, to, diamond_id, transfer_type);
                let _ = response.send(result);
            }

            LedgerMessage::Certify {
                certifier,
                diamond_id,
                certification_id,
                response,
            } => {
                let result = self.certify(certifier, diamond_id, certification_id);
                let _ = response.send(result);
            }

            LedgerMessage::ListDiamond {
                seller,
                diamond_id,
                response,
            } => {
                let result = self.list_diamond(seller, diamond_id);
                let _ = response.send(result);
            }

            LedgerMessage::CancelListing {
                caller,
                listing_id,
                response,
            } => {
                let result = self.cancel_listing(caller, listing_id);
                let _ = response.send(result);
            }

            LedgerMessage::CompleteSale {
                listing_id,
                buyer,
                response,
            } => {
                let result = self.complete_sale(listing_id, buyer);
                let _ = response.send(result);
            }

            LedgerMessage::ReportStolen {
                reporter,
                diamond_id,
                details,
                response,
            } => {
                let result = self.report_stolen(reporter, diamond_id, details);
                let _ = response.send(result);
            }

            LedgerMessage::ResolveReports {
                resolver,
                diamond_id,
                response,
            } => {
                let result = self.resolve_reports(resolver, diamond_id);
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {}
        }
    }

    /// Allocate the next event sequence and wrap the event
    fn next_event(&mut self, event: LedgerEvent) -> EventRecord {
        let record = EventRecord {
            seq: self.next_event_seq,
            recorded_at: Utc::now(),
            event,
        };
        self.next_event_seq += 1;
        record
    }

    /// Publish a committed event and bump counters
    fn publish(&self, record: EventRecord) {
        self.metrics.events_total.inc();
        // No subscribers is fine
        let _ = self.events.send(record);
    }

    fn reject<T>(&self, err: Error) -> Result<T> {
        self.metrics.transitions_rejected_total.inc();
        Err(err)
    }

    // Transition handlers. Each one validates everything against committed
    // state, commits one write batch, then publishes.

    fn register_entity(
        &mut self,
        address: EntityAddress,
        name: String,
        location: String,
        role: EntityRole,
        license_number: String,
    ) -> Result<RegistrationOutcome> {
        // Reviewed now, recorded in memory only after the write commits, so
        // a storage failure cannot leave a registered entity with no
        // persisted record
        let outcome = match self
            .registry
            .review_registration(address, name, location, role, license_number)
        {
            Ok(outcome) => outcome,
            Err(e) => return self.reject(e.into()),
        };

        let (entity, event) = match &outcome {
            RegistrationOutcome::Registered(entity) => (
                entity,
                LedgerEvent::EntityRegistered {
                    address: entity.address.clone(),
                    name: entity.name.clone(),
                    role: entity.role,
                    license_number: entity.license_number.clone(),
                },
            ),
            RegistrationOutcome::Rejected { entity, reason } => (
                entity,
                LedgerEvent::RegistrationRejected {
                    name: entity.name.clone(),
                    location: entity.location.clone(),
                    reason: reason.clone(),
                },
            ),
        };

        let record = self.next_event(event);
        self.storage.put_entity_atomic(entity, &record)?;
        self.registry.commit_registration(&outcome);
        self.publish(record);
        Ok(outcome)
    }

    fn register_raw_diamond(
        &mut self,
        miner: EntityAddress,
        origin: String,
        extracted_at: DateTime<Utc>,
        weight: u64,
        characteristics: String,
    ) -> Result<DiamondId> {
        if !self.registry.is_authorized(&miner, EntityRole::Miner) {
            return self.reject(Error::Unauthorized(format!(
                "{} is not a registered miner",
                miner
            )));
        }
        if weight == 0 {
            return self.reject(Error::InvalidWeight(weight));
        }
        if origin.is_empty() {
            return self.reject(Error::InvalidInput("Origin must not be empty".to_string()));
        }

        let diamond = DiamondRecord {
            id: self.next_diamond_id,
            kind: DiamondKind::Raw,
            origin: origin.clone(),
            extracted_at,
            weight,
            characteristics,
            owner: miner.clone(),
            certification: CertificationStatus::Uncertified,
            provenance: None,
            consumed: false,
            created_at: Utc::now(),
        };
        let record = self.next_event(LedgerEvent::DiamondRegistered {
            diamond_id: diamond.id,
            miner,
            origin,
            weight,
        });

        self.storage.register_diamond_atomic(&diamond, &record)?;
        self.next_diamond_id += 1;
        self.metrics.diamonds_registered_total.inc();
        self.publish(record);
        Ok(diamond.id)
    }

    fn process_diamond(
        &mut self,
        manufacturer: EntityAddress,
        source_ids: Vec<DiamondId>,
        new_origin: Option<String>,
        new_weight: u64,
        characteristics: String,
    ) -> Result<DiamondId> {
        if !self
            .registry
            .is_authorized(&manufacturer, EntityRole::Manufacturer)
        {
            return self.reject(Error::Unauthorized(format!(
                "{} is not a registered manufacturer",
                manufacturer
            )));
        }
        if source_ids.is_empty() {
            return self.reject(Error::InvalidInput(
                "Processing requires at least one source record".to_string(),
            ));
        }
        let mut deduped = source_ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        if deduped.len() != source_ids.len() {
            return self.reject(Error::InvalidInput(
                "Duplicate source record ids".to_string(),
            ));
        }
        if new_weight == 0 {
            return self.reject(Error::InvalidWeight(new_weight));
        }

        // Validate every source before touching any of them
        let mut sources = Vec::with_capacity(source_ids.len());
        for &source_id in &source_ids {
            let source = match self.storage.get_diamond(source_id) {
                Ok(source) => source,
                Err(e) => return self.reject(e),
            };
            if source.owner != manufacturer {
                return self.reject(Error::NotOwner {
                    diamond_id: source_id,
                    caller: manufacturer.to_string(),
                });
            }
            if source.consumed {
                return self.reject(Error::AlreadyConsumed(source_id));
            }
            if self.storage.active_listing_id(source_id)?.is_some() {
                return self.reject(Error::DiamondListed(source_id));
            }
            sources.push(source);
        }

        let origin = new_origin.unwrap_or_else(|| sources[0].origin.clone());
        let new_record = DiamondRecord {
            id: self.next_diamond_id,
            kind: DiamondKind::Processed,
            origin,
            extracted_at: sources[0].extracted_at,
            weight: new_weight,
            characteristics,
            owner: manufacturer.clone(),
            certification: CertificationStatus::Uncertified,
            provenance: Some(ProvenanceLink {
                source_ids: source_ids.clone(),
                manufacturer: manufacturer.clone(),
            }),
            consumed: false,
            created_at: Utc::now(),
        };

        for source in &mut sources {
            source.consumed = true;
        }
        let events: Vec<EventRecord> = source_ids
            .iter()
            .map(|&raw_diamond_id| {
                self.next_event(LedgerEvent::DiamondProcessed {
                    raw_diamond_id,
                    new_diamond_id: new_record.id,
                    manufacturer: manufacturer.clone(),
                })
            })
            .collect();

        self.storage.process_atomic(&sources, &new_record, &events)?;
        self.next_diamond_id += 1;
        for record in events {
            self.publish(record);
        }
        Ok(new_record.id)
    }

    fn transfer(
        &mut self,
        from: EntityAddress,
        to: EntityAddress,
        diamond_id: DiamondId,
        transfer_type: String,
    ) -> Result<()> {
        let mut diamond = match self.storage.get_diamond(diamond_id) {
            Ok(diamond) => diamond,
            Err(e) => return self.reject(e),
        };
        if diamond.owner != from {
            return self.reject(Error::NotOwner {
                diamond_id,
                caller: from.to_string(),
            });
        }
        if diamond.consumed {
            return self.reject(Error::AlreadyConsumed(diamond_id));
        }
        if !self.registry.is_registered(&to) {
            return self.reject(Error::EntityNotRegistered(to.to_string()));
        }
        if self.storage.active_listing_id(diamond_id)?.is_some() {
            return self.reject(Error::DiamondListed(diamond_id));
        }
        if self.storage.is_diamond_stolen(diamond_id)? {
            return self.reject(Error::DiamondStolen(diamond_id));
        }

        diamond.owner = to.clone();
        let record = self.next_event(LedgerEvent::DiamondTransferred {
            diamond_id,
            from,
            to,
            transfer_type,
        });

        self.storage.update_diamond_atomic(&diamond, &record)?;
        self.publish(record);
        Ok(())
    }

    fn certify(
        &mut self,
        certifier: EntityAddress,
        diamond_id: DiamondId,
        certification_id: String,
    ) -> Result<()> {
        if !self.registry.is_authorized(&certifier, EntityRole::Certifier) {
            return self.reject(Error::Unauthorized(format!(
                "{} is not a registered certifier",
                certifier
            )));
        }
        if certification_id.is_empty() {
            return self.reject(Error::InvalidInput(
                "Certification id must not be empty".to_string(),
            ));
        }
        let mut diamond = match self.storage.get_diamond(diamond_id) {
            Ok(diamond) => diamond,
            Err(e) => return self.reject(e),
        };
        if diamond.is_certified() {
            return self.reject(Error::AlreadyCertified(diamond_id));
        }

        diamond.certification = CertificationStatus::Certified {
            certification_id: certification_id.clone(),
            certifier: certifier.clone(),
        };
        let record = self.next_event(LedgerEvent::DiamondCertified {
            diamond_id,
            certifier,
            certification_id,
        });

        self.storage.update_diamond_atomic(&diamond, &record)?;
        self.publish(record);
        Ok(())
    }

    fn list_diamond(&mut self, seller: EntityAddress, diamond_id: DiamondId) -> Result<ListingId> {
        let diamond = match self.storage.get_diamond(diamond_id) {
            Ok(diamond) => diamond,
            Err(e) => return self.reject(e),
        };
        if diamond.owner != seller {
            return self.reject(Error::NotOwner {
                diamond_id,
                caller: seller.to_string(),
            });
        }
        if diamond.consumed {
            return self.reject(Error::AlreadyConsumed(diamond_id));
        }
        if self.storage.active_listing_id(diamond_id)?.is_some() {
            return self.reject(Error::AlreadyListed(diamond_id));
        }
        if self.storage.is_diamond_stolen(diamond_id)? {
            return self.reject(Error::DiamondStolen(diamond_id));
        }

        let listing = Listing {
            id: self.next_listing_id,
            diamond_id,
            seller: seller.clone(),
            active: true,
            created_at: Utc::now(),
        };
        let record = self.next_event(LedgerEvent::DiamondListed {
            listing_id: listing.id,
            diamond_id,
            seller,
        });

        self.storage.create_listing_atomic(&listing, &record)?;
        self.next_listing_id += 1;
        self.publish(record);
        Ok(listing.id)
    }

    fn cancel_listing(&mut self, caller: EntityAddress, listing_id: ListingId) -> Result<()> {
        let mut listing = match self.storage.get_listing(listing_id) {
            Ok(listing) => listing,
            Err(e) => return self.reject(e),
        };
        if !listing.active {
            return self.reject(Error::ListingNotActive(listing_id));
        }
        if listing.seller != caller {
            return self.reject(Error::NotSeller {
                listing_id,
                caller: caller.to_string(),
            });
        }

        listing.active = false;
        let record = self.next_event(LedgerEvent::ListingCancelled {
            listing_id,
            diamond_id: listing.diamond_id,
            seller: listing.seller.clone(),
        });

        self.storage.close_listing_atomic(&listing, &record)?;
        self.publish(record);
        Ok(())
    }

    fn complete_sale(&mut self, listing_id: ListingId, buyer: EntityAddress) -> Result<()> {
        let mut listing = match self.storage.get_listing(listing_id) {
            Ok(listing) => listing,
            Err(e) => return self.reject(e),
        };
        if !listing.active {
            return self.reject(Error::ListingNotActive(listing_id));
        }
        if !self.registry.is_registered(&buyer) {
            return self.reject(Error::EntityNotRegistered(buyer.to_string()));
        }
        let mut diamond = self.storage.get_diamond(listing.diamond_id)?;
        if diamond.consumed {
            return self.reject(Error::AlreadyConsumed(diamond.id));
        }
        // Ownership is re-validated at completion time; a listing that
        // outlived a transfer is stale and must not move custody
        if diamond.owner != listing.seller {
            return self.reject(Error::OwnerMismatch {
                listing_id,
                diamond_id: listing.diamond_id,
            });
        }
        if self.storage.is_diamond_stolen(listing.diamond_id)? {
            return self.reject(Error::DiamondStolen(listing.diamond_id));
        }

        listing.active = false;
        diamond.owner = buyer.clone();
        let record = self.next_event(LedgerEvent::DiamondSold {
            listing_id,
            diamond_id: diamond.id,
            buyer,
        });

        self.storage
            .complete_sale_atomic(&listing, &diamond, &record)?;
        self.metrics.sales_completed_total.inc();
        self.publish(record);
        Ok(())
    }

    fn report_stolen(
        &mut self,
        reporter: EntityAddress,
        diamond_id: DiamondId,
        details: String,
    ) -> Result<()> {
        if let Err(e) = self.storage.get_diamond(diamond_id) {
            return self.reject(e);
        }

        let index = self.storage.get_stolen_reports_keyed(diamond_id)?.len() as u32;
        let report = StolenReport {
            diamond_id,
            reporter: reporter.clone(),
            reported_at: Utc::now(),
            details: details.clone(),
            resolved: false,
            resolver: None,
        };
        let record = self.next_event(LedgerEvent::DiamondReportedStolen {
            diamond_id,
            reporter,
            details,
        });

        self.storage.append_report_atomic(index, &report, &record)?;
        self.publish(record);
        Ok(())
    }

    fn resolve_reports(
        &mut self,
        resolver: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<usize> {
        if let Err(e) = self.storage.get_diamond(diamond_id) {
            return self.reject(e);
        }

        let mut open: Vec<(u32, StolenReport)> = self
            .storage
            .get_stolen_reports_keyed(diamond_id)?
            .into_iter()
            .filter(|(_, report)| !report.resolved)
            .collect();
        if open.is_empty() {
            return self.reject(Error::NoOpenReports(diamond_id));
        }

        for (_, report) in &mut open {
            report.resolved = true;
            report.resolver = Some(resolver.clone());
        }
        let resolved_count = open.len();
        let record = self.next_event(LedgerEvent::StolenReportResolved {
            diamond_id,
            resolver,
        });

        self.storage.resolve_reports_atomic(&open, &record)?;
        self.publish(record);
        Ok(resolved_count)
    }
}

/// Handle for sending commands to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn send<T>(
        &self,
        msg: LedgerMessage,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Register a participant
    pub async fn register_entity(
        &self,
        address: EntityAddress,
        name: impl Into<String>,
        location: impl Into<String>,
        role: EntityRole,
        license_number: impl Into<String>,
    ) -> Result<RegistrationOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::RegisterEntity {
                address,
                name: name.into(),
                location: location.into(),
                role,
                license_number: license_number.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Register a raw diamond
    pub async fn register_raw_diamond(
        &self,
        miner: EntityAddress,
        origin: impl Into<String>,
        extracted_at: DateTime<Utc>,
        weight: u64,
        characteristics: impl Into<String>,
    ) -> Result<DiamondId> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::RegisterRawDiamond {
                miner,
                origin: origin.into(),
                extracted_at,
                weight,
                characteristics: characteristics.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Consume source records into a new processed record
    pub async fn process_diamond(
        &self,
        manufacturer: EntityAddress,
        source_ids: Vec<DiamondId>,
        new_origin: Option<String>,
        new_weight: u64,
        characteristics: impl Into<String>,
    ) -> Result<DiamondId> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::ProcessDiamond {
                manufacturer,
                source_ids,
                new_origin,
                new_weight,
                characteristics: characteristics.into(),
                response: tx,
            },
            rx,
        )
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
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::Transfer {
                from,
                to,
                diamond_id,
                transfer_type: transfer_type.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Attach an attestation
    pub async fn certify(
        &self,
        certifier: EntityAddress,
        diamond_id: DiamondId,
        certification_id: impl Into<String>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::Certify {
                certifier,
                diamond_id,
                certification_id: certification_id.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Create a listing
    pub async fn list_diamond(
        &self,
        seller: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<ListingId> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::ListDiamond {
                seller,
                diamond_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Cancel an active listing
    pub async fn cancel_listing(
        &self,
        caller: EntityAddress,
        listing_id: ListingId,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::CancelListing {
                caller,
                listing_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Complete a sale
    pub async fn complete_sale(&self, listing_id: ListingId, buyer: EntityAddress) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::CompleteSale {
                listing_id,
                buyer,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// File a theft report
    pub async fn report_stolen(
        &self,
        reporter: EntityAddress,
        diamond_id: DiamondId,
        details: impl Into<String>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::ReportStolen {
                reporter,
                diamond_id,
                details: details.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Resolve all open reports for a diamond; returns the count resolved
    pub async fn resolve_reports(
        &self,
        resolver: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(
            LedgerMessage::ResolveReports {
                resolver,
                diamond_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    registry: Arc<EntityRegistry>,
    events: broadcast::Sender<EventRecord>,
    metrics: Arc<Metrics>,
) -> Result<LedgerHandle> {
    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(1000);
    let actor = LedgerActor::new(storage, registry, rx, events, metrics)?;

    tokio::spawn(async move {
        actor.run().await;
    });

    Ok(LedgerHandle::new(tx))
}
