//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `skumap` exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                          |
//! |------|-----------|------------------------------------------------------|
//! | 0    | Universal | Success                                              |
//! | 1    | Universal | General error (unspecified)                          |
//! | 2    | Universal | CLI usage error (bad args, unreadable file)          |
//! | 3    | map       | Sales SKUs remain unmapped after matching            |
//! | 4    | reconcile | Sales were excluded or MSKUs were oversold           |
//! | 5    | config    | Configuration failed to parse or validate            |
//! | 6    | data      | Input data rejected (catalog, sales, mappings)       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `engine_exit_code` or the relevant command

use skumap_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without warnings.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Workflow outcomes (3-4)
// =============================================================================

/// `map` finished but at least one SKU has no mapping.
/// The mapping file is still written.
pub const EXIT_UNMAPPED: u8 = 3;

/// `reconcile` applied sales but reported exclusions or oversells.
/// The inventory file is still written.
pub const EXIT_RECON_WARNINGS: u8 = 4;

// =============================================================================
// Rejected input (5-6)
// =============================================================================

/// Config TOML failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 5;

/// Catalog, sales, mapping or ledger data rejected by the engine:
/// empty or duplicate catalog, unknown MSKU, unparseable quantity.
pub const EXIT_DATA: u8 = 6;

/// Map an engine error to its exit code.
pub fn engine_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io(_) => EXIT_ERROR,
        ReconError::EmptyCatalog
        | ReconError::UnknownMsku { .. }
        | ReconError::DuplicateMasterKey { .. }
        | ReconError::UnknownFulfillmentCenter { .. }
        | ReconError::BlankSku
        | ReconError::MissingColumn { .. }
        | ReconError::MissingValue { .. }
        | ReconError::QuantityParse { .. }
        | ReconError::InvalidValue { .. }
        | ReconError::Ledger(_) => EXIT_DATA,
    }
}
