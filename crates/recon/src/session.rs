use std::collections::{BTreeSet, HashSet};

use crate::engine;
use crate::error::ReconError;
use crate::ledger::{AppliedLedger, SalesBatch};
use crate::matcher::Matcher;
use crate::model::{
    Catalog, MappingSet, MatchOutcome, ReconResult, RepeatedContentWarning, SalesRecord, SkippedBatch, SkuMapping,
};

/// One reconciliation session: a catalog snapshot, the active mappings,
/// and the batches already applied. The session is the single writer for
/// all three.
pub struct Session {
    catalog: Catalog,
    mappings: MappingSet,
    matcher: Matcher,
    ledger: AppliedLedger,
}

impl Session {
    pub fn new(catalog: Catalog, matcher: Matcher) -> Self {
        Self {
            catalog,
            mappings: MappingSet::new(),
            matcher,
            ledger: AppliedLedger::default(),
        }
    }

    /// Seed prior mappings. Every mapping must point into the catalog.
    pub fn with_mappings(mut self, mappings: MappingSet) -> Result<Self, ReconError> {
        if let Some(dangling) = mappings.iter().find(|m| !self.catalog.contains(&m.msku)) {
            return Err(ReconError::UnknownMsku { msku: dangling.msku.clone() });
        }
        self.mappings = mappings;
        Ok(self)
    }

    pub fn with_ledger(mut self, ledger: AppliedLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    pub fn ledger(&self) -> &AppliedLedger {
        &self.ledger
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn into_parts(self) -> (Catalog, MappingSet, AppliedLedger) {
        (self.catalog, self.mappings, self.ledger)
    }

    /// Run the matcher over `observed`, keeping every existing mapping.
    pub fn run_matching<'a>(
        &mut self,
        observed: impl IntoIterator<Item = &'a str>,
    ) -> Result<MatchOutcome, ReconError> {
        let outcome = self.matcher.match_skus(&self.catalog, observed, &self.mappings)?;
        self.mappings = outcome.mappings.clone();
        Ok(outcome)
    }

    pub fn assign(&mut self, local_sku: &str, msku: &str) -> Result<SkuMapping, ReconError> {
        self.matcher.assign(&self.catalog, &mut self.mappings, local_sku, msku)
    }

    /// Distinct SKUs in `batches` that still lack a mapping, sorted.
    pub fn pending_skus(&self, batches: &[SalesBatch]) -> Vec<String> {
        batches
            .iter()
            .flat_map(|b| b.skus())
            .filter(|sku| !self.mappings.contains(*sku))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Apply every row not yet in inventory, then update the ledger.
    ///
    /// A batch is identified by its source label and rows. New batches are
    /// applied whole. For a batch already in the ledger only the rows that
    /// were excluded last time are retried, so a SKU resolved with
    /// [`Session::assign`] between runs reaches inventory exactly once.
    /// Fully applied batches, and a batch listed twice in `batches`, are
    /// skipped and listed in `skipped_batches`. The session's catalog is
    /// replaced with the resulting snapshot.
    pub fn reconcile(&mut self, batches: &[SalesBatch]) -> ReconResult {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut work: Vec<(&SalesBatch, Vec<usize>)> = Vec::new();
        let mut skipped = Vec::new();
        let mut repeated = Vec::new();

        for batch in batches {
            let rows = match self.ledger.get(&batch.batch_id) {
                _ if !seen.insert(batch.batch_id.as_str()) => None,
                Some(applied) if applied.is_settled() => None,
                Some(applied) => {
                    log::info!(
                        "retrying {} excluded row(s) of {}",
                        applied.pending_rows.len(),
                        batch.source_file
                    );
                    Some(applied.pending_rows.clone())
                }
                None => {
                    if let Some(twin) = self.ledger.same_content(batch) {
                        log::warn!(
                            "{} has the same rows as {} (applied {}); applying it as a separate export",
                            batch.source_file,
                            twin.source_file,
                            twin.applied_at
                        );
                        repeated.push(RepeatedContentWarning {
                            batch_id: batch.batch_id.clone(),
                            source_file: batch.source_file.clone(),
                            matches_source_file: twin.source_file.clone(),
                        });
                    }
                    Some((0..batch.records.len()).collect())
                }
            };

            match rows {
                Some(rows) => work.push((batch, rows)),
                None => {
                    log::warn!(
                        "sales batch {} ({}) already applied; skipping",
                        batch.source_file,
                        &batch.batch_id[..12.min(batch.batch_id.len())]
                    );
                    skipped.push(SkippedBatch {
                        batch_id: batch.batch_id.clone(),
                        source_file: batch.source_file.clone(),
                    });
                }
            }
        }

        let sales: Vec<SalesRecord> = work
            .iter()
            .flat_map(|(batch, rows)| rows.iter().filter_map(|&i| batch.records.get(i).cloned()))
            .collect();
        let mut result = engine::reconcile(&self.catalog, &sales, &self.mappings);

        for (batch, rows) in work {
            let pending: Vec<usize> = rows
                .into_iter()
                .filter(|&i| batch.records.get(i).is_some_and(|r| !self.resolves(&r.local_sku)))
                .collect();
            self.ledger.record(batch, pending);
        }

        result.summary.skipped_batches = skipped.len();
        result.summary.repeated_batches = repeated.len();
        result.skipped_batches = skipped;
        result.repeated_content = repeated;
        self.catalog = result.catalog.clone();
        result
    }

    /// `local_sku` maps to an MSKU present in the catalog.
    fn resolves(&self, local_sku: &str) -> bool {
        self.mappings
            .resolve(local_sku)
            .is_some_and(|msku| self.catalog.contains(msku))
    }
}
