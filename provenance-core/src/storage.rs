//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `entities` - Registry snapshot (key: address bytes)
//! - `diamonds` - Diamond records (key: big-endian id)
//! - `listings` - Listings, active and historical (key: big-endian id)
//! - `reports` - Stolen report log (key: diamond_id || report index)
//! - `events` - Append-only event log (key: big-endian sequence)
//! - `indices` - Secondary indices (active listing per diamond, per-diamond
//!   event history)
//!
//! Compound mutations (sale completion, processing) go through a single
//! `WriteBatch`, so readers never observe a partially applied transition.

use crate::{
    error::{Error, Result},
    types::{DiamondId, DiamondRecord, EventRecord, Listing, ListingId, StolenReport},
    Config,
};
use entity_registry::Entity;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;

/// Column family names
const CF_ENTITIES: &str = "entities";
const CF_DIAMONDS: &str = "diamonds";
const CF_LISTINGS: &str = "listings";
const CF_REPORTS: &str = "reports";
const CF_EVENTS: &str = "events";
const CF_INDICES: &str = "indices";

/// Index tags in the `indices` column family
const IDX_ACTIVE_LISTING: &[u8; 2] = b"al";
const IDX_DIAMOND_EVENT: &[u8; 2] = b"de";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ENTITIES, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_DIAMONDS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_LISTINGS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_REPORTS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = %path.display(), "Opened RocksDB");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // State is frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn id_key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }

    fn report_key(diamond_id: DiamondId, index: u32) -> Vec<u8> {
        let mut key = diamond_id.to_be_bytes().to_vec();
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    fn active_listing_key(diamond_id: DiamondId) -> Vec<u8> {
        let mut key = IDX_ACTIVE_LISTING.to_vec();
        key.extend_from_slice(&diamond_id.to_be_bytes());
        key
    }

    fn diamond_event_key(diamond_id: DiamondId, seq: u64) -> Vec<u8> {
        let mut key = IDX_DIAMOND_EVENT.to_vec();
        key.extend_from_slice(&diamond_id.to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    /// Stage an event into the log and its per-diamond history index
    fn stage_event(&self, batch: &mut WriteBatch, record: &EventRecord) -> Result<()> {
        let cf_events = self.cf_handle(CF_EVENTS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let value = bincode::serialize(record)?;
        batch.put_cf(&cf_events, Self::id_key(record.seq), &value);

        for diamond_id in record.event.diamond_ids() {
            batch.put_cf(&cf_indices, Self::diamond_event_key(diamond_id, record.seq), b"");
        }

        Ok(())
    }

    fn stage_diamond(&self, batch: &mut WriteBatch, diamond: &DiamondRecord) -> Result<()> {
        let cf = self.cf_handle(CF_DIAMONDS)?;
        batch.put_cf(&cf, Self::id_key(diamond.id), bincode::serialize(diamond)?);
        Ok(())
    }

    fn stage_listing(&self, batch: &mut WriteBatch, listing: &Listing) -> Result<()> {
        let cf_listings = self.cf_handle(CF_LISTINGS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_listings,
            Self::id_key(listing.id),
            bincode::serialize(listing)?,
        );

        let index_key = Self::active_listing_key(listing.diamond_id);
        if listing.active {
            batch.put_cf(&cf_indices, index_key, Self::id_key(listing.id));
        } else {
            batch.delete_cf(&cf_indices, index_key);
        }
        Ok(())
    }

    // Entity operations

    /// Persist an entity record together with its registration event
    pub fn put_entity_atomic(&self, entity: &Entity, event: &EventRecord) -> Result<()> {
        let cf = self.cf_handle(CF_ENTITIES)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf,
            entity.address.as_str().as_bytes(),
            bincode::serialize(entity)?,
        );
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;

        tracing::debug!(address = %entity.address, "Entity persisted");
        Ok(())
    }

    /// Load all persisted entities (registry restore at open)
    pub fn load_entities(&self) -> Result<Vec<Entity>> {
        let cf = self.cf_handle(CF_ENTITIES)?;
        let mut entities = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            entities.push(bincode::deserialize(&value)?);
        }
        Ok(entities)
    }

    // Diamond operations

    /// Get diamond record by id
    pub fn get_diamond(&self, diamond_id: DiamondId) -> Result<DiamondRecord> {
        let cf = self.cf_handle(CF_DIAMONDS)?;
        let value = self
            .db
            .get_cf(&cf, Self::id_key(diamond_id))?
            .ok_or(Error::DiamondNotFound(diamond_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Highest assigned diamond id, which doubles as the total record count
    /// since ids are assigned 1..=n
    pub fn max_diamond_id(&self) -> Result<DiamondId> {
        self.max_key(CF_DIAMONDS)
    }

    /// Persist a new raw record with its registration event
    pub fn register_diamond_atomic(
        &self,
        diamond: &DiamondRecord,
        event: &EventRecord,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_diamond(&mut batch, diamond)?;
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;

        tracing::debug!(diamond_id = diamond.id, owner = %diamond.owner, "Diamond registered");
        Ok(())
    }

    /// Persist a processing step: consumed sources, the new processed
    /// record, and one event per (source, new) pair, all in one batch
    pub fn process_atomic(
        &self,
        consumed: &[DiamondRecord],
        new_record: &DiamondRecord,
        events: &[EventRecord],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        for source in consumed {
            self.stage_diamond(&mut batch, source)?;
        }
        self.stage_diamond(&mut batch, new_record)?;
        for event in events {
            self.stage_event(&mut batch, event)?;
        }
        self.db.write(batch)?;

        tracing::debug!(
            new_diamond_id = new_record.id,
            sources = consumed.len(),
            "Diamond processed"
        );
        Ok(())
    }

    /// Persist an updated record (transfer, certification) with its event
    pub fn update_diamond_atomic(
        &self,
        diamond: &DiamondRecord,
        event: &EventRecord,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_diamond(&mut batch, diamond)?;
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;
        Ok(())
    }

    // Listing operations

    /// Get listing by id
    pub fn get_listing(&self, listing_id: ListingId) -> Result<Listing> {
        let cf = self.cf_handle(CF_LISTINGS)?;
        let value = self
            .db
            .get_cf(&cf, Self::id_key(listing_id))?
            .ok_or(Error::ListingNotFound(listing_id))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Highest assigned listing id
    pub fn max_listing_id(&self) -> Result<ListingId> {
        self.max_key(CF_LISTINGS)
    }

    /// Active listing id for a diamond, if one exists
    pub fn active_listing_id(&self, diamond_id: DiamondId) -> Result<Option<ListingId>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let value = self.db.get_cf(&cf, Self::active_listing_key(diamond_id))?;
        match value {
            Some(bytes) => {
                let id_bytes: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt active-listing index".to_string()))?;
                Ok(Some(u64::from_be_bytes(id_bytes)))
            }
            None => Ok(None),
        }
    }

    /// All currently active listings
    pub fn get_active_listings(&self) -> Result<Vec<Listing>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let mode = IteratorMode::From(IDX_ACTIVE_LISTING, Direction::Forward);

        let mut listings = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(IDX_ACTIVE_LISTING) {
                break;
            }
            let id_bytes: [u8; 8] = value
                .as_ref()
                .try_into()
                .map_err(|_| Error::Storage("Corrupt active-listing index".to_string()))?;
            listings.push(self.get_listing(u64::from_be_bytes(id_bytes))?);
        }
        Ok(listings)
    }

    /// Persist a new active listing with its event
    pub fn create_listing_atomic(&self, listing: &Listing, event: &EventRecord) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_listing(&mut batch, listing)?;
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;

        tracing::debug!(
            listing_id = listing.id,
            diamond_id = listing.diamond_id,
            "Listing created"
        );
        Ok(())
    }

    /// Persist a deactivated listing (cancellation) with its event
    pub fn close_listing_atomic(&self, listing: &Listing, event: &EventRecord) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_listing(&mut batch, listing)?;
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Persist a completed sale: deactivated listing, ownership change, and
    /// the sale event in one batch. The ledger must never show an active
    /// listing for an already-transferred diamond.
    pub fn complete_sale_atomic(
        &self,
        listing: &Listing,
        diamond: &DiamondRecord,
        event: &EventRecord,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_listing(&mut batch, listing)?;
        self.stage_diamond(&mut batch, diamond)?;
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;

        tracing::info!(
            listing_id = listing.id,
            diamond_id = diamond.id,
            buyer = %diamond.owner,
            "Sale completed"
        );
        Ok(())
    }

    // Stolen report operations

    /// Reports for a diamond with their log positions, in filing order
    pub fn get_stolen_reports_keyed(
        &self,
        diamond_id: DiamondId,
    ) -> Result<Vec<(u32, StolenReport)>> {
        let cf = self.cf_handle(CF_REPORTS)?;
        let prefix = diamond_id.to_be_bytes();
        let mode = IteratorMode::From(&prefix, Direction::Forward);

        let mut reports = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let index_bytes: [u8; 4] = key[8..12]
                .try_into()
                .map_err(|_| Error::Storage("Corrupt report key".to_string()))?;
            reports.push((u32::from_be_bytes(index_bytes), bincode::deserialize(&value)?));
        }
        Ok(reports)
    }

    /// Reports for a diamond in filing order
    pub fn get_stolen_reports(&self, diamond_id: DiamondId) -> Result<Vec<StolenReport>> {
        Ok(self
            .get_stolen_reports_keyed(diamond_id)?
            .into_iter()
            .map(|(_, report)| report)
            .collect())
    }

    /// Derived stolen flag: true iff any unresolved report exists
    pub fn is_diamond_stolen(&self, diamond_id: DiamondId) -> Result<bool> {
        Ok(self
            .get_stolen_reports_keyed(diamond_id)?
            .iter()
            .any(|(_, report)| !report.resolved))
    }

    /// Append a report at the given per-diamond index with its event
    pub fn append_report_atomic(
        &self,
        index: u32,
        report: &StolenReport,
        event: &EventRecord,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_REPORTS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf,
            Self::report_key(report.diamond_id, index),
            bincode::serialize(report)?,
        );
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;

        tracing::warn!(
            diamond_id = report.diamond_id,
            reporter = %report.reporter,
            "Diamond reported stolen"
        );
        Ok(())
    }

    /// Rewrite resolved reports with their resolution event in one batch
    pub fn resolve_reports_atomic(
        &self,
        resolved: &[(u32, StolenReport)],
        event: &EventRecord,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_REPORTS)?;
        let mut batch = WriteBatch::default();
        for (index, report) in resolved {
            batch.put_cf(
                &cf,
                Self::report_key(report.diamond_id, *index),
                bincode::serialize(report)?,
            );
        }
        self.stage_event(&mut batch, event)?;
        self.db.write(batch)?;
        Ok(())
    }

    // Event log operations

    /// Get event by sequence number
    pub fn get_event(&self, seq: u64) -> Result<EventRecord> {
        let cf = self.cf_handle(CF_EVENTS)?;
        let value = self
            .db
            .get_cf(&cf, Self::id_key(seq))?
            .ok_or_else(|| Error::Storage(format!("Event {} not found", seq)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Highest assigned event sequence
    pub fn max_event_seq(&self) -> Result<u64> {
        self.max_key(CF_EVENTS)
    }

    /// Full event history touching a diamond, in ledger order
    pub fn get_diamond_history(&self, diamond_id: DiamondId) -> Result<Vec<EventRecord>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let mut prefix = IDX_DIAMOND_EVENT.to_vec();
        prefix.extend_from_slice(&diamond_id.to_be_bytes());
        let mode = IteratorMode::From(&prefix, Direction::Forward);

        let mut events = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let seq_bytes: [u8; 8] = key[10..18]
                .try_into()
                .map_err(|_| Error::Storage("Corrupt history index".to_string()))?;
            events.push(self.get_event(u64::from_be_bytes(seq_bytes))?);
        }
        Ok(events)
    }

    // Helpers

    fn max_key(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        let mut iter = self.db.iterator_cf(&cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                let key_bytes: [u8; 8] = key[..8]
                    .try_into()
                    .map_err(|_| Error::Storage(format!("Corrupt key in {}", cf_name)))?;
                Ok(u64::from_be_bytes(key_bytes))
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CertificationStatus, DiamondKind, LedgerEvent};
    use chrono::Utc;
    use entity_registry::EntityAddress;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_diamond(id: DiamondId, owner: &str) -> DiamondRecord {
        DiamondRecord {
            id,
            kind: DiamondKind::Raw,
            origin: "Jwaneng, Botswana".to_string(),
            extracted_at: Utc::now(),
            weight: 150,
            characteristics: "octahedral crystal".to_string(),
            owner: EntityAddress::new(owner),
            certification: CertificationStatus::Uncertified,
            provenance: None,
            consumed: false,
            created_at: Utc::now(),
        }
    }

    fn test_event(seq: u64, diamond_id: DiamondId) -> EventRecord {
        EventRecord {
            seq,
            recorded_at: Utc::now(),
            event: LedgerEvent::DiamondRegistered {
                diamond_id,
                miner: EntityAddress::new("0xminer"),
                origin: "Jwaneng, Botswana".to_string(),
                weight: 150,
            },
        }
    }

    #[test]
    fn test_register_and_get_diamond() {
        let (storage, _temp) = test_storage();
        let diamond = test_diamond(1, "0xminer");

        storage
            .register_diamond_atomic(&diamond, &test_event(1, 1))
            .unwrap();

        let retrieved = storage.get_diamond(1).unwrap();
        assert_eq!(retrieved, diamond);
        assert_eq!(storage.max_diamond_id().unwrap(), 1);
        assert!(matches!(
            storage.get_diamond(2),
            Err(Error::DiamondNotFound(2))
        ));
    }

    #[test]
    fn test_active_listing_index() {
        let (storage, _temp) = test_storage();
        storage
            .register_diamond_atomic(&test_diamond(1, "0xminer"), &test_event(1, 1))
            .unwrap();

        let mut listing = Listing {
            id: 1,
            diamond_id: 1,
            seller: EntityAddress::new("0xminer"),
            active: true,
            created_at: Utc::now(),
        };
        let event = EventRecord {
            seq: 2,
            recorded_at: Utc::now(),
            event: LedgerEvent::DiamondListed {
                listing_id: 1,
                diamond_id: 1,
                seller: EntityAddress::new("0xminer"),
            },
        };
        storage.create_listing_atomic(&listing, &event).unwrap();

        assert_eq!(storage.active_listing_id(1).unwrap(), Some(1));
        assert_eq!(storage.get_active_listings().unwrap().len(), 1);

        listing.active = false;
        let cancel = EventRecord {
            seq: 3,
            recorded_at: Utc::now(),
            event: LedgerEvent::ListingCancelled {
                listing_id: 1,
                diamond_id: 1,
                seller: EntityAddress::new("0xminer"),
            },
        };
        storage.close_listing_atomic(&listing, &cancel).unwrap();

        assert_eq!(storage.active_listing_id(1).unwrap(), None);
        assert!(storage.get_active_listings().unwrap().is_empty());
        // Historical listing retained
        assert!(!storage.get_listing(1).unwrap().active);
    }

    #[test]
    fn test_stolen_reports_derived_flag() {
        let (storage, _temp) = test_storage();

        assert!(!storage.is_diamond_stolen(1).unwrap());

        let report = StolenReport {
            diamond_id: 1,
            reporter: EntityAddress::new("0xreporter"),
            reported_at: Utc::now(),
            details: "stolen in transit".to_string(),
            resolved: false,
            resolver: None,
        };
        let event = EventRecord {
            seq: 1,
            recorded_at: Utc::now(),
            event: LedgerEvent::DiamondReportedStolen {
                diamond_id: 1,
                reporter: EntityAddress::new("0xreporter"),
                details: "stolen in transit".to_string(),
            },
        };
        storage.append_report_atomic(0, &report, &event).unwrap();
        assert!(storage.is_diamond_stolen(1).unwrap());

        let mut resolved = report.clone();
        resolved.resolved = true;
        resolved.resolver = Some(EntityAddress::new("0xadmin"));
        let resolve_event = EventRecord {
            seq: 2,
            recorded_at: Utc::now(),
            event: LedgerEvent::StolenReportResolved {
                diamond_id: 1,
                resolver: EntityAddress::new("0xadmin"),
            },
        };
        storage
            .resolve_reports_atomic(&[(0, resolved)], &resolve_event)
            .unwrap();

        assert!(!storage.is_diamond_stolen(1).unwrap());
        assert_eq!(storage.get_stolen_reports(1).unwrap().len(), 1);
    }

    #[test]
    fn test_diamond_history() {
        let (storage, _temp) = test_storage();
        storage
            .register_diamond_atomic(&test_diamond(1, "0xminer"), &test_event(1, 1))
            .unwrap();
        storage
            .register_diamond_atomic(&test_diamond(2, "0xminer"), &test_event(2, 2))
            .unwrap();

        let mut transferred = storage.get_diamond(1).unwrap();
        transferred.owner = EntityAddress::new("0xmfg");
        let event = EventRecord {
            seq: 3,
            recorded_at: Utc::now(),
            event: LedgerEvent::DiamondTransferred {
                diamond_id: 1,
                from: EntityAddress::new("0xminer"),
                to: EntityAddress::new("0xmfg"),
                transfer_type: "sale".to_string(),
            },
        };
        storage.update_diamond_atomic(&transferred, &event).unwrap();

        let history = storage.get_diamond_history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].seq, 1);
        assert_eq!(history[1].seq, 3);

        // Diamond 2's history is untouched
        assert_eq!(storage.get_diamond_history(2).unwrap().len(), 1);
        assert_eq!(storage.max_event_seq().unwrap(), 3);
    }

    #[test]
    fn test_entities_round_trip() {
        let (storage, _temp) = test_storage();
        let entity = Entity {
            address: EntityAddress::new("0xminer"),
            name: "Global Mining Corp".to_string(),
            location: "Kimberley, Australia".to_string(),
            role: entity_registry::EntityRole::Miner,
            license_number: "a001".to_string(),
            status: entity_registry::RegistrationStatus::Registered,
            registered_at: Utc::now(),
        };
        let event = EventRecord {
            seq: 1,
            recorded_at: Utc::now(),
            event: LedgerEvent::EntityRegistered {
                address: EntityAddress::new("0xminer"),
                name: "Global Mining Corp".to_string(),
                role: entity_registry::EntityRole::Miner,
                license_number: "a001".to_string(),
            },
        };
        storage.put_entity_atomic(&entity, &event).unwrap();

        let loaded = storage.load_entities().unwrap();
        assert_eq!(loaded, vec![entity]);
    }
}
