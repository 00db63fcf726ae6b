//! `skumap map` and `skumap assign`: build and curate the SKU → MSKU mapping file.

use std::path::{Path, PathBuf};

use skumap_recon::loader::write_mappings_csv;
use skumap_recon::model::MatchOutcome;
use skumap_recon::{ReconConfig, ReconError, Session};

use crate::exit_codes::EXIT_UNMAPPED;
use crate::inputs::{engine_err, load_batches, load_catalog, load_config, load_mappings, load_matcher, print_json, write};
use crate::CliError;

pub const DEFAULT_MAPPINGS_FILE: &str = "sku_mappings.csv";

/// How many close MSKUs to offer when an assignment names an unknown one.
const SUGGESTION_LIMIT: usize = 3;

fn open_session(catalog: &Path, mappings: Option<&Path>, config: &ReconConfig) -> Result<Session, CliError> {
    let catalog = load_catalog(catalog, config)?;
    let session = Session::new(catalog, load_matcher(config)?);
    match mappings {
        Some(path) => session.with_mappings(load_mappings(path, config)?).map_err(|e| {
            let hint = format!("re-run `skumap assign` for the stale SKU or remove it from {}", path.display());
            engine_err(e).with_hint(hint)
        }),
        None => Ok(session),
    }
}

fn save_mappings(session: &Session, path: &Path, config: &ReconConfig) -> Result<(), CliError> {
    let csv = write_mappings_csv(session.mappings(), config.output.mapping_provenance).map_err(engine_err)?;
    write(path, &csv)
}

// ============================================================================
// map
// ============================================================================

pub fn cmd_map(
    catalog: PathBuf,
    sales: Vec<PathBuf>,
    mappings: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let mut session = open_session(&catalog, mappings.as_deref(), &config)?;
    let batches = load_batches(&sales, &config)?;

    let outcome = session
        .run_matching(batches.iter().flat_map(|b| b.skus()))
        .map_err(engine_err)?;

    let output = output
        .or(mappings)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPINGS_FILE));
    save_mappings(&session, &output, &config)?;

    if json {
        print_json(&outcome)?;
    }
    print_match_summary(&outcome, &output);

    if outcome.is_complete() {
        return Ok(());
    }
    Err(CliError::new(EXIT_UNMAPPED, format!("{} SKU(s) remain unmapped", outcome.unmapped.len()))
        .with_hint(format!(
            "resolve with: skumap assign --catalog {} --mappings {} <SKU> <MSKU>",
            catalog.display(),
            output.display(),
        )))
}

fn print_match_summary(outcome: &MatchOutcome, output: &Path) {
    eprintln!(
        "matched {} new SKU(s), {} already mapped, {} unmapped; {} mapping(s) in {}",
        outcome.auto_mapped.len(),
        outcome.already_mapped,
        outcome.unmapped.len(),
        outcome.mappings.len(),
        output.display(),
    );
    for m in &outcome.auto_mapped {
        eprintln!("  + {} -> {} ({})", m.local_sku, m.msku, m.confidence);
    }
    for u in &outcome.unmapped {
        match (&u.best_candidate, u.best_score) {
            (Some(candidate), Some(score)) => {
                eprintln!("  ? {} [{}] best: {} ({})", u.local_sku, u.reason, candidate, score)
            }
            _ => eprintln!("  ? {} [{}]", u.local_sku, u.reason),
        }
    }
}

// ============================================================================
// assign
// ============================================================================

pub fn cmd_assign(
    catalog: PathBuf,
    mappings: PathBuf,
    sku: String,
    msku: String,
    config: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let mut session = open_session(&catalog, Some(&mappings), &config)?;

    let mapping = match session.assign(&sku, &msku) {
        Ok(mapping) => mapping,
        Err(err @ ReconError::UnknownMsku { .. }) => {
            let suggestions = session
                .matcher()
                .suggestions(session.catalog(), &msku, SUGGESTION_LIMIT);
            let mut cli_err = engine_err(err);
            if !suggestions.is_empty() {
                let listed: Vec<String> = suggestions
                    .iter()
                    .map(|(candidate, score)| format!("{candidate} ({score})"))
                    .collect();
                cli_err = cli_err.with_hint(format!("closest MSKUs: {}", listed.join(", ")));
            }
            return Err(cli_err);
        }
        Err(err) => return Err(engine_err(err)),
    };

    save_mappings(&session, &mappings, &config)?;
    eprintln!(
        "assigned {} -> {} ({}, confidence {})",
        mapping.local_sku, mapping.msku, mapping.method, mapping.confidence
    );
    Ok(())
}
