//! Marketplace engine
//!
//! Thin authority layer over the ledger. Listing and reporting calls pass
//! straight through; sale completion and report resolution first check the
//! configured authority, then hand the transition to the ledger, which
//! re-validates all state preconditions and commits atomically.

use crate::{config::SaleAuthority, Config, Error, Result};
use entity_registry::EntityAddress;
use provenance_core::{DiamondId, Ledger, Listing, ListingId, StolenReport};
use std::sync::Arc;

/// Marketplace engine
pub struct MarketplaceEngine {
    /// Provenance ledger (single source of truth)
    ledger: Arc<Ledger>,

    /// Configuration
    config: Config,
}

impl MarketplaceEngine {
    /// Create engine with its own ledger
    pub fn new(config: Config) -> Result<Self> {
        let ledger = Arc::new(Ledger::open(&config.ledger)?);
        Ok(Self::with_ledger(ledger, config))
    }

    /// Create engine over an existing ledger
    pub fn with_ledger(ledger: Arc<Ledger>, config: Config) -> Self {
        Self { ledger, config }
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// List an owned diamond for sale
    pub async fn list_diamond(
        &self,
        seller: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<ListingId> {
        Ok(self.ledger.list_diamond(seller, diamond_id).await?)
    }

    /// Cancel an active listing; seller only
    pub async fn cancel_listing(
        &self,
        caller: EntityAddress,
        listing_id: ListingId,
    ) -> Result<()> {
        Ok(self.ledger.cancel_listing(caller, listing_id).await?)
    }

    /// Complete a sale on an active listing
    ///
    /// The caller must hold the configured sale authority; the authority
    /// check runs before the ledger transition, so unauthorized calls never
    /// reach state validation.
    pub async fn complete_sale(
        &self,
        caller: &EntityAddress,
        listing_id: ListingId,
        buyer: EntityAddress,
    ) -> Result<()> {
        match self.config.sale_authority {
            SaleAuthority::Admin => {
                if !self.config.is_admin(caller.as_str()) {
                    return Err(Error::Unauthorized(format!(
                        "{} is not a marketplace admin",
                        caller
                    )));
                }
            }
            SaleAuthority::Seller => {
                let listing = self.ledger.get_listing_details(listing_id)?;
                if &listing.seller != caller {
                    return Err(Error::Unauthorized(format!(
                        "{} is not the seller of listing {}",
                        caller, listing_id
                    )));
                }
            }
            SaleAuthority::Buyer => {
                if caller != &buyer {
                    return Err(Error::Unauthorized(format!(
                        "{} is not the buyer of this sale",
                        caller
                    )));
                }
            }
        }

        self.ledger.complete_sale(listing_id, buyer).await?;
        tracing::info!(listing_id, caller = %caller, "Sale completed");
        Ok(())
    }

    /// File a theft report; any identity may report
    pub async fn report_stolen(
        &self,
        reporter: EntityAddress,
        diamond_id: DiamondId,
        details: impl Into<String>,
    ) -> Result<()> {
        Ok(self.ledger.report_stolen(reporter, diamond_id, details).await?)
    }

    /// Resolve all open reports for a diamond; admins only
    pub async fn resolve_reports(
        &self,
        resolver: EntityAddress,
        diamond_id: DiamondId,
    ) -> Result<usize> {
        if !self.config.is_admin(resolver.as_str()) {
            return Err(Error::Unauthorized(format!(
                "{} is not a marketplace admin",
                resolver
            )));
        }
        Ok(self.ledger.resolve_reports(resolver, diamond_id).await?)
    }

    // Queries

    /// All currently active listings
    pub fn get_active_listings(&self) -> Result<Vec<Listing>> {
        Ok(self.ledger.get_active_listings()?)
    }

    /// Listing by id, active or historical
    pub fn get_listing_details(&self, listing_id: ListingId) -> Result<Listing> {
        Ok(self.ledger.get_listing_details(listing_id)?)
    }

    /// All reports ever filed for a diamond
    pub fn get_stolen_reports(&self, diamond_id: DiamondId) -> Result<Vec<StolenReport>> {
        Ok(self.ledger.get_stolen_reports(diamond_id)?)
    }

    /// Derived stolen flag
    pub fn is_diamond_stolen(&self, diamond_id: DiamondId) -> Result<bool> {
        Ok(self.ledger.is_diamond_stolen(diamond_id)?)
    }
}
