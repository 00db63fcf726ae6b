use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Catalog, ExcludedSalesWarning, ExclusionReason, MappingSet, SalesRecord};

/// Running total for one group of sales rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesTotal {
    pub quantity: u64,
    pub record_count: usize,
    pub source_files: BTreeSet<String>,
}

impl SalesTotal {
    fn add(&mut self, record: &SalesRecord) {
        self.quantity = self.quantity.saturating_add(record.quantity);
        self.record_count += 1;
        self.source_files.insert(record.source_file.clone());
    }
}

/// Sales split into what can be applied and what cannot.
#[derive(Debug, Default)]
pub struct ResolvedSales {
    /// Totals per catalog MSKU.
    pub by_msku: BTreeMap<String, SalesTotal>,
    /// Totals per local SKU that could not be resolved to a catalog MSKU.
    pub excluded: Vec<ExcludedSalesWarning>,
}

/// Resolve each sale through `mappings` and sum quantities per MSKU.
/// Sales with no mapping, or whose mapping points outside the catalog,
/// are totalled per local SKU instead of being dropped.
pub fn resolve_sales(sales: &[SalesRecord], mappings: &MappingSet, catalog: &Catalog) -> ResolvedSales {
    let mut by_msku: BTreeMap<String, SalesTotal> = BTreeMap::new();
    let mut excluded: BTreeMap<String, (ExclusionReason, Option<String>, SalesTotal)> = BTreeMap::new();

    for record in sales {
        match mappings.resolve(&record.local_sku) {
            Some(msku) if catalog.contains(msku) => {
                by_msku.entry(msku.to_string()).or_default().add(record);
            }
            resolved => {
                let (reason, msku) = match resolved {
                    Some(msku) => (ExclusionReason::UnknownMsku, Some(msku.to_string())),
                    None => (ExclusionReason::Unmapped, None),
                };
                excluded
                    .entry(record.local_sku.clone())
                    .or_insert_with(|| (reason, msku, SalesTotal::default()))
                    .2
                    .add(record);
            }
        }
    }

    let excluded = excluded
        .into_iter()
        .map(|(local_sku, (reason, msku, total))| ExcludedSalesWarning {
            local_sku,
            reason,
            msku,
            quantity: total.quantity,
            record_count: total.record_count,
            source_files: total.source_files.into_iter().collect(),
        })
        .collect();

    ResolvedSales { by_msku, excluded }
}
