//! End-to-end supply-chain lifecycle tests over the full stack

use chrono::Utc;
use entity_registry::{EntityAddress, EntityRole};
use marketplace::{Config, Error, MarketplaceEngine};
use provenance_core::{DiamondKind, Error as LedgerError};

fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut config = Config::default();
    config.admins = vec!["0xadmin".to_string()];
    config.ledger.data_dir = temp_dir.path().to_path_buf();
    config
}

/// The mine-to-retail walkthrough: registration gate, transfer, listing,
/// theft report blocking the sale, resolution, then completion.
#[tokio::test]
async fn test_mine_to_retail_lifecycle() {
    let temp_dir = tempfile::tempdir().unwrap();
    let engine = MarketplaceEngine::new(test_config(&temp_dir)).unwrap();
    let ledger = engine.ledger();

    let miner = EntityAddress::new("0xA");
    let mfg = EntityAddress::new("0xB");
    let buyer = EntityAddress::new("0xC");
    let admin = EntityAddress::new("0xadmin");

    // Register entity A as Miner and enter a raw stone
    ledger
        .register_entity(
            miner.clone(),
            "Global Mining Corp",
            "Gaborone, Botswana",
            EntityRole::Miner,
            "a001",
        )
        .await
        .unwrap();
    let id = ledger
        .register_raw_diamond(miner.clone(), "Botswana", Utc::now(), 500, "rough stone")
        .await
        .unwrap();
    assert_eq!(id, 1);
    let details = ledger.get_diamond_details(id).unwrap();
    assert_eq!(details.owner, miner);

    // Transfer to B fails until B is registered
    let result = ledger.transfer(miner.clone(), mfg.clone(), id, "sale").await;
    assert!(matches!(result, Err(LedgerError::EntityNotRegistered(_))));

    ledger
        .register_entity(
            mfg.clone(),
            "Precision Cutters Inc.",
            "Antwerp, Belgium",
            EntityRole::Manufacturer,
            "b001",
        )
        .await
        .unwrap();
    ledger
        .transfer(miner.clone(), mfg.clone(), id, "sale")
        .await
        .unwrap();
    assert_eq!(ledger.get_diamond_details(id).unwrap().owner, mfg);

    // B lists the stone
    let listing_id = engine.list_diamond(mfg.clone(), id).await.unwrap();
    assert_eq!(listing_id, 1);
    assert_eq!(engine.get_active_listings().unwrap().len(), 1);

    // A theft report blocks the sale
    engine
        .report_stolen(EntityAddress::new("0xvictim"), id, "details")
        .await
        .unwrap();
    assert!(engine.is_diamond_stolen(id).unwrap());

    ledger
        .register_entity(
            buyer.clone(),
            "Fifth Avenue Gems",
            "New York, USA",
            EntityRole::Retailer,
            "d001",
        )
        .await
        .unwrap();
    let result = engine.complete_sale(&admin, listing_id, buyer.clone()).await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::DiamondStolen(_)))
    ));
    // Listing and ownership untouched by the failure
    assert!(engine.get_listing_details(listing_id).unwrap().active);
    assert_eq!(ledger.get_diamond_details(id).unwrap().owner, mfg);

    // Resolution clears the flag and the sale completes
    engine.resolve_reports(admin.clone(), id).await.unwrap();
    assert!(!engine.is_diamond_stolen(id).unwrap());

    engine
        .complete_sale(&admin, listing_id, buyer.clone())
        .await
        .unwrap();
    let details = ledger.get_diamond_details(id).unwrap();
    assert_eq!(details.owner, buyer);
    assert!(!details.listed);
    assert!(!engine.get_listing_details(listing_id).unwrap().active);
    assert!(engine.get_active_listings().unwrap().is_empty());
}

/// Processing and certification over the marketplace stack: two raws become
/// one certified cut stone that sells at retail.
#[tokio::test]
async fn test_processing_and_certification_flow() {
    let temp_dir = tempfile::tempdir().unwrap();
    let engine = MarketplaceEngine::new(test_config(&temp_dir)).unwrap();
    let ledger = engine.ledger();

    let miner = EntityAddress::new("0xminer");
    let mfg = EntityAddress::new("0xmfg");
    let cert = EntityAddress::new("0xcert");
    let shop = EntityAddress::new("0xshop");

    for (address, name, role, license) in [
        (&miner, "Global Mining Corp", EntityRole::Miner, "a001"),
        (&mfg, "Precision Cutters Inc.", EntityRole::Manufacturer, "b001"),
        (&cert, "Gem Institute", EntityRole::Certifier, "c001"),
        (&shop, "Fifth Avenue Gems", EntityRole::Retailer, "d001"),
    ] {
        ledger
            .register_entity(address.clone(), name, "Antwerp, Belgium", role, license)
            .await
            .unwrap();
    }

    let r1 = ledger
        .register_raw_diamond(miner.clone(), "Jwaneng, Botswana", Utc::now(), 320, "rough")
        .await
        .unwrap();
    let r2 = ledger
        .register_raw_diamond(miner.clone(), "Jwaneng, Botswana", Utc::now(), 410, "rough")
        .await
        .unwrap();
    ledger.transfer(miner.clone(), mfg.clone(), r1, "sale").await.unwrap();
    ledger.transfer(miner.clone(), mfg.clone(), r2, "sale").await.unwrap();

    let cut = ledger
        .process_diamond(mfg.clone(), vec![r1, r2], None, 550, "princess cut pair")
        .await
        .unwrap();
    let record = ledger.get_diamond(cut).unwrap();
    assert_eq!(record.kind, DiamondKind::Processed);
    assert_eq!(record.provenance.as_ref().unwrap().source_ids, vec![r1, r2]);

    // Consumed raws are out of circulation
    let result = engine.list_diamond(mfg.clone(), r1).await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::AlreadyConsumed(_)))
    ));

    ledger.certify(cert, cut, "GIA-2291").await.unwrap();
    assert!(ledger.get_diamond(cut).unwrap().is_certified());

    let listing_id = engine.list_diamond(mfg, cut).await.unwrap();
    engine
        .complete_sale(&EntityAddress::new("0xadmin"), listing_id, shop.clone())
        .await
        .unwrap();
    assert_eq!(ledger.get_diamond_details(cut).unwrap().owner, shop);

    // Lineage is queryable end to end
    let history = ledger.get_diamond_history(cut).unwrap();
    let names: Vec<&str> = history.iter().map(|r| r.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "DiamondProcessed",
            "DiamondProcessed",
            "DiamondCertified",
            "DiamondListed",
            "DiamondSold",
        ]
    );
}

/// Cancel leaves ownership untouched, sale moves it, and both terminal
/// listings survive as history.
#[tokio::test]
async fn test_listing_round_trips() {
    let temp_dir = tempfile::tempdir().unwrap();
    let engine = MarketplaceEngine::new(test_config(&temp_dir)).unwrap();
    let ledger = engine.ledger();

    let miner = EntityAddress::new("0xminer");
    let shop = EntityAddress::new("0xshop");
    for (address, name, role, license) in [
        (&miner, "Global Mining Corp", EntityRole::Miner, "a001"),
        (&shop, "Fifth Avenue Gems", EntityRole::Retailer, "d001"),
    ] {
        ledger
            .register_entity(address.clone(), name, "Antwerp, Belgium", role, license)
            .await
            .unwrap();
    }

    let id = ledger
        .register_raw_diamond(miner.clone(), "Jwaneng, Botswana", Utc::now(), 150, "raw")
        .await
        .unwrap();

    // list → cancel leaves owner unchanged
    let first = engine.list_diamond(miner.clone(), id).await.unwrap();
    engine.cancel_listing(miner.clone(), first).await.unwrap();
    assert_eq!(ledger.get_diamond_details(id).unwrap().owner, miner);
    assert!(!engine.get_listing_details(first).unwrap().active);

    // list → sale moves ownership and closes the listing
    let second = engine.list_diamond(miner.clone(), id).await.unwrap();
    assert_eq!(second, first + 1);
    engine
        .complete_sale(&EntityAddress::new("0xadmin"), second, shop.clone())
        .await
        .unwrap();
    assert_eq!(ledger.get_diamond_details(id).unwrap().owner, shop);

    // Both listings survive as history
    assert!(!engine.get_listing_details(first).unwrap().active);
    assert!(!engine.get_listing_details(second).unwrap().active);
}
