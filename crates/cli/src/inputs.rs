//! File plumbing shared by the commands: every read and write goes through
//! here so path errors carry the same exit code and message shape.

use std::path::{Path, PathBuf};

use skumap_recon::loader::{load_catalog_csv, load_mappings_csv, load_sales_csv};
use skumap_recon::{AppliedLedger, Catalog, MappingSet, Matcher, ReconConfig, ReconError, SalesBatch};

use crate::exit_codes::{engine_exit_code, EXIT_ERROR, EXIT_USAGE};
use crate::CliError;

pub fn engine_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::DuplicateMasterKey { .. } => Some("each MSKU must appear once in the catalog".to_string()),
        ReconError::MissingColumn { column, .. } => {
            Some(format!("add a '{column}' header or map the column in the [catalog]/[sales] config"))
        }
        ReconError::UnknownFulfillmentCenter { .. } => {
            Some("extend [catalog] fulfillment_centers or fix the catalog row".to_string())
        }
        _ => None,
    };
    CliError { code: engine_exit_code(&err), message: err.to_string(), hint }
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))
}

pub fn write(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write {}: {e}", path.display())))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// File name used as the source label in diagnostics and reports.
fn label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load and validate the config, or fall back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    match path {
        Some(path) => ReconConfig::from_toml(&read(path)?).map_err(engine_err),
        None => Ok(ReconConfig::default()),
    }
}

pub fn load_matcher(config: &ReconConfig) -> Result<Matcher, CliError> {
    Matcher::from_config(&config.matcher).map_err(engine_err)
}

pub fn load_catalog(path: &Path, config: &ReconConfig) -> Result<Catalog, CliError> {
    load_catalog_csv(&label(path), &read(path)?, &config.catalog).map_err(engine_err)
}

pub fn load_batches(paths: &[PathBuf], config: &ReconConfig) -> Result<Vec<SalesBatch>, CliError> {
    paths
        .iter()
        .map(|path| load_sales_csv(&label(path), &read(path)?, &config.sales.columns).map_err(engine_err))
        .collect()
}

/// A mapping file that does not exist yet is an empty mapping set.
pub fn load_mappings(path: &Path, config: &ReconConfig) -> Result<MappingSet, CliError> {
    if !path.exists() {
        log::info!("{} not found; starting with no mappings", path.display());
        return Ok(MappingSet::new());
    }
    load_mappings_csv(&label(path), &read(path)?, config.matcher.manual_confidence).map_err(engine_err)
}

pub fn load_ledger(path: &Path) -> Result<AppliedLedger, CliError> {
    if !path.exists() {
        log::info!("{} not found; starting a new ledger", path.display());
        return Ok(AppliedLedger::default());
    }
    AppliedLedger::from_json(&read(path)?).map_err(engine_err)
}

/// Pretty JSON on stdout; everything human-facing goes to stderr.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}
