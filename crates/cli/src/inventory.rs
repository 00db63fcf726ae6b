//! `skumap reconcile`: apply sales to the catalog and write the updated inventory.

use std::path::{Path, PathBuf};

use skumap_recon::loader::write_inventory_csv;
use skumap_recon::{ReconResult, Session};

use crate::exit_codes::EXIT_RECON_WARNINGS;
use crate::inputs::{
    engine_err, load_batches, load_catalog, load_config, load_ledger, load_mappings, load_matcher, print_json, write,
};
use crate::CliError;

pub fn cmd_reconcile(
    catalog: PathBuf,
    sales: Vec<PathBuf>,
    mappings: PathBuf,
    output: PathBuf,
    ledger: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    if !mappings.exists() {
        return Err(CliError::usage(format!("mappings file not found: {}", mappings.display()))
            .with_hint("run `skumap map` first to create it"));
    }

    let mut session = Session::new(load_catalog(&catalog, &config)?, load_matcher(&config)?)
        .with_mappings(load_mappings(&mappings, &config)?)
        .map_err(engine_err)?;
    if let Some(path) = &ledger {
        session = session.with_ledger(load_ledger(path)?);
    }

    let batches = load_batches(&sales, &config)?;
    let pending = session.pending_skus(&batches);
    if !pending.is_empty() {
        log::warn!("{} SKU(s) have no mapping and will be excluded: {}", pending.len(), pending.join(", "));
    }

    let result = session.reconcile(&batches);

    write(&output, &write_inventory_csv(&result.catalog).map_err(engine_err)?)?;
    if let Some(path) = &ledger {
        write(path, &session.ledger().to_json().map_err(engine_err)?)?;
    }

    if json {
        print_json(&result)?;
    }
    print_recon_summary(&result, &output);

    let s = &result.summary;
    if s.has_warnings() {
        return Err(CliError::new(
            EXIT_RECON_WARNINGS,
            format!(
                "{} SKU(s) excluded, {} MSKU(s) oversold, {} repeated export(s)",
                s.excluded_skus, s.oversold_mskus, s.repeated_batches
            ),
        ));
    }
    Ok(())
}

fn print_recon_summary(result: &ReconResult, output: &Path) {
    let s = &result.summary;
    eprintln!(
        "reconciled {} of {} sales record(s): {} unit(s) applied, {} excluded; inventory written to {}",
        s.applied_records,
        s.sales_records,
        s.quantity_applied,
        s.quantity_excluded,
        output.display(),
    );
    for skipped in &result.skipped_batches {
        eprintln!("  = {} already applied, skipped", skipped.source_file);
    }
    for r in &result.repeated_content {
        eprintln!(
            "  ~ {} has the same rows as {} and was applied again; confirm it is not a renamed re-upload",
            r.source_file, r.matches_source_file
        );
    }
    for e in &result.excluded {
        match &e.msku {
            Some(msku) => eprintln!("  - {} x{} excluded [{}: {}]", e.local_sku, e.quantity, e.reason, msku),
            None => eprintln!("  - {} x{} excluded [{}]", e.local_sku, e.quantity, e.reason),
        }
    }
    for o in &result.oversold {
        eprintln!(
            "  ! {} oversold: {} available, {} sold, short {}",
            o.msku, o.available, o.requested, o.shortfall
        );
    }
}
