use std::path::PathBuf;

use skumap_recon::loader::{load_catalog_csv, load_mappings_csv, load_sales_csv, write_inventory_csv, write_mappings_csv};
use skumap_recon::model::{ExclusionReason, UnmappedReason};
use skumap_recon::{reconcile, Catalog, MappingMethod, Matcher, ReconConfig, ReconError, SalesBatch, Session};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn config() -> ReconConfig {
    ReconConfig::from_toml(&read_fixture("skumap.toml")).unwrap()
}

fn load_catalog(config: &ReconConfig) -> Catalog {
    load_catalog_csv("master.csv", &read_fixture("master.csv"), &config.catalog).unwrap()
}

fn load_batches(config: &ReconConfig) -> Vec<SalesBatch> {
    ["sales_amazon.csv", "sales_shopify.csv"]
        .iter()
        .map(|name| load_sales_csv(name, &read_fixture(name), &config.sales.columns).unwrap())
        .collect()
}

fn new_session(config: &ReconConfig) -> Session {
    Session::new(load_catalog(config), Matcher::from_config(&config.matcher).unwrap())
}

// -------------------------------------------------------------------------
// Matching
// -------------------------------------------------------------------------

#[test]
fn match_fixture_sales() {
    let config = config();
    let mut session = new_session(&config);
    let batches = load_batches(&config);

    let observed: Vec<&str> = batches.iter().flat_map(|b| b.skus()).collect();
    let outcome = session.run_matching(observed).unwrap();

    let auto: Vec<(&str, &str)> = outcome
        .auto_mapped
        .iter()
        .map(|m| (m.local_sku.as_str(), m.msku.as_str()))
        .collect();
    assert_eq!(
        auto,
        vec![
            ("CHERRY-RED", "CHERRY_RED"),
            ("Golden_Apple", "APPLE_GOLD"),
            ("Yellow_Banana", "BANANA_YELLOW"),
            ("pear-green", "PEAR_GREEN"),
        ]
    );
    assert!(outcome.auto_mapped.iter().all(|m| m.method == MappingMethod::Auto && m.confidence >= 80));

    let unmapped: Vec<(&str, UnmappedReason)> = outcome
        .unmapped
        .iter()
        .map(|u| (u.local_sku.as_str(), u.reason))
        .collect();
    assert_eq!(
        unmapped,
        vec![
            ("GLD", UnmappedReason::BelowThreshold),
            ("ZZZ999", UnmappedReason::BelowThreshold),
            ("golden apple!", UnmappedReason::InvalidFormat),
        ]
    );
    assert!(!outcome.is_complete());
    assert_eq!(session.pending_skus(&batches), vec!["GLD", "ZZZ999", "golden apple!"]);
}

#[test]
fn unmatched_sku_with_no_candidate_reports_smallest_msku() {
    let config = config();
    let mut session = new_session(&config);
    let outcome = session.run_matching(["ZZZ999"]).unwrap();
    assert_eq!(outcome.unmapped[0].best_candidate.as_deref(), Some("APPLE_GOLD"));
    assert_eq!(outcome.unmapped[0].best_score, Some(0));
}

// -------------------------------------------------------------------------
// Reconciliation
// -------------------------------------------------------------------------

#[test]
fn full_flow_with_exclusions_and_oversell() {
    let config = config();
    let mut session = new_session(&config);
    let batches = load_batches(&config);

    let observed: Vec<&str> = batches.iter().flat_map(|b| b.skus()).collect();
    session.run_matching(observed).unwrap();
    session.assign("GLD", "APPLE_GOLD").unwrap();

    let result = session.reconcile(&batches);
    let qty = |msku: &str| result.catalog.get(msku).unwrap().quantity;

    assert_eq!(qty("APPLE_GOLD"), 50);
    assert_eq!(qty("PEAR_GREEN"), 30);
    assert_eq!(qty("BANANA_YELLOW"), 20);
    assert_eq!(qty("CHERRY_RED"), 0);

    assert_eq!(result.oversold.len(), 1);
    assert_eq!(result.oversold[0].msku, "CHERRY_RED");
    assert_eq!(result.oversold[0].shortfall, 3);

    let excluded: Vec<(&str, u64)> = result.excluded.iter().map(|e| (e.local_sku.as_str(), e.quantity)).collect();
    assert_eq!(excluded, vec![("ZZZ999", 4), ("golden apple!", 1)]);
    assert!(result.excluded.iter().all(|e| e.reason == ExclusionReason::Unmapped));

    assert_eq!(result.summary.sales_records, 7);
    assert_eq!(result.summary.quantity_applied, 73);
    assert_eq!(result.summary.quantity_excluded, 5);
    assert!(result.summary.has_warnings());

    assert_eq!(
        write_inventory_csv(&result.catalog).unwrap(),
        "MSKU,Available Quantity,Fulfillment Center\n\
         APPLE_GOLD,50,FBA\n\
         BANANA_YELLOW,20,MAIN\n\
         CHERRY_RED,0,FBA\n\
         PEAR_GREEN,30,MAIN\n"
    );
}

#[test]
fn manual_resolution_brings_sales_into_reconciliation() {
    let config = config();
    let mut session = new_session(&config);
    let batches = load_batches(&config);

    let observed: Vec<&str> = batches.iter().flat_map(|b| b.skus()).collect();
    session.run_matching(observed).unwrap();
    session.assign("GLD", "APPLE_GOLD").unwrap();
    session.assign("ZZZ999", "APPLE_GOLD").unwrap();
    session.assign("golden apple!", "APPLE_GOLD").unwrap();
    assert!(session.pending_skus(&batches).is_empty());

    let result = session.reconcile(&batches);
    assert_eq!(result.catalog.get("APPLE_GOLD").unwrap().quantity, 100 - 20 - 30 - 4 - 1);
    assert!(result.excluded.is_empty());
}

#[test]
fn ledger_round_trip_prevents_double_apply() {
    let config = config();
    let batches = load_batches(&config);

    let mut first = new_session(&config);
    first.run_matching(batches.iter().flat_map(|b| b.skus())).unwrap();
    for sku in ["GLD", "ZZZ999", "golden apple!"] {
        first.assign(sku, "APPLE_GOLD").unwrap();
    }
    first.reconcile(&batches);
    let (catalog, mappings, ledger) = first.into_parts();
    let ledger_json = ledger.to_json().unwrap();

    let mut second = Session::new(catalog, Matcher::from_config(&config.matcher).unwrap())
        .with_mappings(mappings)
        .unwrap()
        .with_ledger(skumap_recon::AppliedLedger::from_json(&ledger_json).unwrap());
    let before = second.catalog().clone();

    let again = second.reconcile(&load_batches(&config));
    assert_eq!(again.skipped_batches.len(), 2);
    assert_eq!(again.catalog.records().collect::<Vec<_>>(), before.records().collect::<Vec<_>>());
}

#[test]
fn ledger_carries_excluded_rows_into_the_next_run() {
    let config = config();
    let batches = load_batches(&config);

    let mut first = new_session(&config);
    first.run_matching(batches.iter().flat_map(|b| b.skus())).unwrap();
    first.assign("GLD", "APPLE_GOLD").unwrap();
    let before = first.reconcile(&batches);
    assert_eq!(before.summary.quantity_excluded, 5);
    let (catalog, mut mappings, ledger) = first.into_parts();

    // Operator resolves the leftovers offline, then re-runs the same exports.
    let matcher = Matcher::from_config(&config.matcher).unwrap();
    matcher.assign(&catalog, &mut mappings, "ZZZ999", "PEAR_GREEN").unwrap();
    matcher.assign(&catalog, &mut mappings, "golden apple!", "APPLE_GOLD").unwrap();

    let mut second = Session::new(catalog, matcher)
        .with_mappings(mappings)
        .unwrap()
        .with_ledger(skumap_recon::AppliedLedger::from_json(&ledger.to_json().unwrap()).unwrap());
    let after = second.reconcile(&load_batches(&config));

    assert_eq!(after.summary.sales_records, 2);
    assert_eq!(after.catalog.get("PEAR_GREEN").unwrap().quantity, 30 - 4);
    assert_eq!(after.catalog.get("APPLE_GOLD").unwrap().quantity, 50 - 1);
    assert!(after.excluded.is_empty());
    assert!(second.ledger().batches().iter().all(|b| b.is_settled()));
}

#[test]
fn mapping_file_round_trip_preserves_provenance() {
    let config = config();
    let mut session = new_session(&config);
    session.run_matching(["Golden_Apple", "pear-green"]).unwrap();
    session.assign("GLD", "APPLE_GOLD").unwrap();

    let csv = write_mappings_csv(session.mappings(), config.output.mapping_provenance).unwrap();
    assert!(csv.starts_with("SKU,MSKU,Method,Confidence\n"));

    let restored = load_mappings_csv("sku_mappings.csv", &csv, config.matcher.manual_confidence).unwrap();
    assert_eq!(&restored, session.mappings());
}

#[test]
fn stale_mapping_is_excluded_by_pure_reconcile() {
    let config = config();
    let catalog = load_catalog(&config);
    let mappings = load_mappings_csv("old.csv", "SKU,MSKU\nGLD,APPLE_GOLD_V1\n", 100).unwrap();
    let batch = load_sales_csv("s.csv", "SKU,Quantity\nGLD,3\n", &config.sales.columns).unwrap();

    let result = reconcile(&catalog, &batch.records, &mappings);
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].reason, ExclusionReason::UnknownMsku);
    assert_eq!(result.excluded[0].msku.as_deref(), Some("APPLE_GOLD_V1"));
    assert_eq!(result.catalog.get("APPLE_GOLD").unwrap().quantity, 100);
}

// -------------------------------------------------------------------------
// Data quality
// -------------------------------------------------------------------------

#[test]
fn duplicate_master_key_aborts_load() {
    let config = config();
    let err = load_catalog_csv("duplicate_master.csv", &read_fixture("duplicate_master.csv"), &config.catalog)
        .unwrap_err();
    assert_eq!(err, ReconError::DuplicateMasterKey { msku: "APPLE_GOLD".into(), row: 3 });
}

#[test]
fn empty_catalog_cannot_match() {
    let config = config();
    let catalog = load_catalog_csv("empty.csv", "MSKU,Quantity,Fulfillment Center\n", &config.catalog).unwrap();
    let mut session = Session::new(catalog, Matcher::from_config(&config.matcher).unwrap());
    assert_eq!(session.run_matching(["GLD"]).unwrap_err(), ReconError::EmptyCatalog);
}
