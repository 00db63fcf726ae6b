//! `skumap-recon`: SKU to master-SKU matching and inventory reconciliation.
//!
//! Pure engine crate: receives file contents and pre-loaded records,
//! returns mappings, reports and catalog snapshots. No CLI or filesystem
//! dependencies.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod ledger;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod session;
pub mod similarity;

pub use config::ReconConfig;
pub use engine::reconcile;
pub use error::ReconError;
pub use ledger::{AppliedLedger, SalesBatch};
pub use matcher::Matcher;
pub use model::{
    Catalog, MappingMethod, MappingSet, MasterRecord, MatchOutcome, ReconResult, SalesRecord, SkuMapping,
};
pub use registry::SessionRegistry;
pub use session::Session;
pub use similarity::{Metric, Similarity};
