use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One row of the master catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterRecord {
    pub msku: String,
    pub quantity: u64,
    pub fulfillment_center: String,
}

impl MasterRecord {
    pub fn new(msku: impl Into<String>, quantity: u64, fulfillment_center: impl Into<String>) -> Self {
        Self {
            msku: msku.into(),
            quantity,
            fulfillment_center: fulfillment_center.into(),
        }
    }
}

/// Versioned snapshot of the master catalog, keyed by MSKU.
///
/// Iteration is always in MSKU order, so anything derived from the catalog
/// is independent of the order rows were loaded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    records: BTreeMap<String, MasterRecord>,
    version: u64,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate MSKUs instead of merging them.
    /// Error rows are 1-based positions in `records`.
    pub fn from_records(records: impl IntoIterator<Item = MasterRecord>) -> Result<Self, ReconError> {
        let mut map = BTreeMap::new();
        for (i, record) in records.into_iter().enumerate() {
            if map.contains_key(&record.msku) {
                return Err(ReconError::DuplicateMasterKey {
                    msku: record.msku,
                    row: i + 1,
                });
            }
            map.insert(record.msku.clone(), record);
        }
        Ok(Self { records: map, version: 0 })
    }

    pub fn get(&self, msku: &str) -> Option<&MasterRecord> {
        self.records.get(msku)
    }

    pub fn contains(&self, msku: &str) -> bool {
        self.records.contains_key(msku)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> impl Iterator<Item = &MasterRecord> {
        self.records.values()
    }

    pub fn mskus(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Copy of this catalog with the version bumped. Reconciliation writes
    /// into the successor, never into `self`.
    pub(crate) fn successor(&self) -> Self {
        Self {
            records: self.records.clone(),
            version: self.version + 1,
        }
    }

    pub(crate) fn get_mut(&mut self, msku: &str) -> Option<&mut MasterRecord> {
        self.records.get_mut(msku)
    }
}

// ---------------------------------------------------------------------------
// Sales
// ---------------------------------------------------------------------------

/// One row of a sales export. Quantity is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
    pub local_sku: String,
    pub quantity: u64,
    pub source_file: String,
}

impl SalesRecord {
    pub fn new(local_sku: impl Into<String>, quantity: u64, source_file: impl Into<String>) -> Self {
        Self {
            local_sku: local_sku.into(),
            quantity,
            source_file: source_file.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    Auto,
    Manual,
}

impl MappingMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for MappingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuMapping {
    pub local_sku: String,
    pub msku: String,
    /// 0-100 similarity for automatic mappings; the manual sentinel otherwise.
    pub confidence: u8,
    pub method: MappingMethod,
}

/// Active mappings, at most one per local SKU. Inserting replaces whatever
/// was there (last write wins); `method` records who wrote it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingSet {
    entries: BTreeMap<String, SkuMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, local_sku: &str) -> Option<&SkuMapping> {
        self.entries.get(local_sku)
    }

    pub fn contains(&self, local_sku: &str) -> bool {
        self.entries.contains_key(local_sku)
    }

    /// MSKU the local SKU resolves to, if mapped.
    pub fn resolve(&self, local_sku: &str) -> Option<&str> {
        self.entries.get(local_sku).map(|m| m.msku.as_str())
    }

    /// Insert or overwrite, returning the superseded mapping.
    pub fn upsert(&mut self, mapping: SkuMapping) -> Option<SkuMapping> {
        self.entries.insert(mapping.local_sku.clone(), mapping)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuMapping> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SkuMapping> for MappingSet {
    fn from_iter<I: IntoIterator<Item = SkuMapping>>(iter: I) -> Self {
        let mut set = Self::new();
        for mapping in iter {
            set.upsert(mapping);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Matching output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    /// Best candidate scored below the configured threshold.
    BelowThreshold,
    /// SKU failed the configured format pattern and was not scored.
    InvalidFormat,
}

impl std::fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowThreshold => write!(f, "below_threshold"),
            Self::InvalidFormat => write!(f, "invalid_format"),
        }
    }
}

/// A local SKU that needs an operator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedSku {
    pub local_sku: String,
    pub reason: UnmappedReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    /// Full active mapping set after this run (existing + new).
    pub mappings: MappingSet,
    /// Mappings created by this run.
    pub auto_mapped: Vec<SkuMapping>,
    pub unmapped: Vec<UnmappedSku>,
    /// Observed SKUs skipped because a mapping already existed.
    pub already_mapped: usize,
}

impl MatchOutcome {
    /// True once every observed SKU has an active mapping.
    pub fn is_complete(&self) -> bool {
        self.unmapped.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// Quantity applied to one MSKU (and its fulfillment center).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedQuantity {
    pub msku: String,
    pub fulfillment_center: String,
    pub quantity_before: u64,
    pub quantity_sold: u64,
    pub quantity_after: u64,
    pub record_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No mapping exists for the local SKU.
    Unmapped,
    /// The mapping points at an MSKU that is not in the catalog.
    UnknownMsku,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmapped => write!(f, "unmapped"),
            Self::UnknownMsku => write!(f, "unknown_msku"),
        }
    }
}

/// Sales that were not applied to any MSKU, totalled per local SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedSalesWarning {
    pub local_sku: String,
    pub reason: ExclusionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msku: Option<String>,
    pub quantity: u64,
    pub record_count: usize,
    pub source_files: Vec<String>,
}

/// Sales exceeded stock; the MSKU was clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OversoldWarning {
    pub msku: String,
    pub fulfillment_center: String,
    pub available: u64,
    pub requested: u64,
    pub shortfall: u64,
}

/// A batch the session refused to apply a second time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBatch {
    pub batch_id: String,
    pub source_file: String,
}

/// A new export whose rows are identical to one already applied under
/// another source name. It is applied; the operator should confirm it is
/// not a renamed re-upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatedContentWarning {
    pub batch_id: String,
    pub source_file: String,
    pub matches_source_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub sales_records: usize,
    pub applied_records: usize,
    pub quantity_applied: u64,
    pub quantity_excluded: u64,
    pub excluded_skus: usize,
    pub oversold_mskus: usize,
    pub skipped_batches: usize,
    pub repeated_batches: usize,
}

impl ReconSummary {
    /// Anything an operator should look at.
    pub fn has_warnings(&self) -> bool {
        self.excluded_skus > 0 || self.oversold_mskus > 0 || self.repeated_batches > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub catalog_version_before: u64,
    pub catalog_version_after: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Post-update catalog snapshot.
    pub catalog: Catalog,
    pub applied: Vec<AppliedQuantity>,
    pub excluded: Vec<ExcludedSalesWarning>,
    pub oversold: Vec<OversoldWarning>,
    pub skipped_batches: Vec<SkippedBatch>,
    pub repeated_content: Vec<RepeatedContentWarning>,
}
