use std::collections::BTreeSet;

use regex::Regex;

use crate::config::{MatcherConfig, DEFAULT_SKU_PATTERN};
use crate::error::ReconError;
use crate::model::{Catalog, MappingMethod, MappingSet, MatchOutcome, SkuMapping, UnmappedReason, UnmappedSku};
use crate::similarity::Similarity;

/// Proposes SKU -> MSKU mappings and applies operator overrides.
pub struct Matcher {
    threshold: u8,
    similarity: Box<dyn Similarity>,
    sku_pattern: Option<Regex>,
    manual_confidence: u8,
}

impl Matcher {
    pub fn from_config(config: &MatcherConfig) -> Result<Self, ReconError> {
        let sku_pattern = if config.sku_pattern.is_empty() {
            None
        } else {
            Some(
                Regex::new(&config.sku_pattern)
                    .map_err(|e| ReconError::ConfigValidation(format!("matcher.sku_pattern: {e}")))?,
            )
        };
        Ok(Self {
            threshold: config.threshold,
            similarity: Box::new(config.metric),
            sku_pattern,
            manual_confidence: config.manual_confidence,
        })
    }

    /// Matcher with a caller-supplied metric, no format check, and a manual
    /// confidence of 100.
    pub fn with_similarity(threshold: u8, similarity: Box<dyn Similarity>) -> Self {
        Self {
            threshold,
            similarity,
            sku_pattern: None,
            manual_confidence: 100,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn manual_confidence(&self) -> u8 {
        self.manual_confidence
    }

    /// Highest-scoring MSKU for `local_sku`. Ties go to the lexicographically
    /// smallest MSKU, independent of catalog load order.
    pub fn best_candidate<'c>(&self, catalog: &'c Catalog, local_sku: &str) -> Option<(&'c str, u8)> {
        let mut best: Option<(&str, u8)> = None;
        // Catalog iterates in ascending MSKU order; strict `>` keeps the first.
        for msku in catalog.mskus() {
            let score = self.similarity.score(local_sku, msku);
            log::debug!("score {local_sku} ~ {msku} = {score}");
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((msku, score));
            }
        }
        best
    }

    /// Up to `limit` MSKUs ranked by score (descending), then MSKU.
    pub fn suggestions(&self, catalog: &Catalog, query: &str, limit: usize) -> Vec<(String, u8)> {
        let mut scored: Vec<(String, u8)> = catalog
            .mskus()
            .map(|msku| (msku.to_string(), self.similarity.score(query, msku)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored
    }

    /// Match every observed SKU not already covered by `existing`.
    ///
    /// Existing mappings are carried over untouched, so re-running never
    /// demotes a manual assignment. SKUs scoring below the threshold are
    /// reported in `unmapped`, never guessed.
    pub fn match_skus<'a>(
        &self,
        catalog: &Catalog,
        observed: impl IntoIterator<Item = &'a str>,
        existing: &MappingSet,
    ) -> Result<MatchOutcome, ReconError> {
        if catalog.is_empty() {
            return Err(ReconError::EmptyCatalog);
        }

        let observed: BTreeSet<&str> = observed.into_iter().collect();
        let mut mappings = existing.clone();
        let mut auto_mapped = Vec::new();
        let mut unmapped = Vec::new();
        let mut already_mapped = 0;

        for sku in observed {
            if mappings.contains(sku) {
                already_mapped += 1;
                continue;
            }

            if let Some(ref pattern) = self.sku_pattern {
                if !pattern.is_match(sku) {
                    log::warn!("invalid SKU format: {sku}");
                    unmapped.push(UnmappedSku {
                        local_sku: sku.to_string(),
                        reason: UnmappedReason::InvalidFormat,
                        best_candidate: None,
                        best_score: None,
                    });
                    continue;
                }
            }

            let Some((msku, score)) = self.best_candidate(catalog, sku) else {
                continue;
            };

            if score >= self.threshold {
                let mapping = SkuMapping {
                    local_sku: sku.to_string(),
                    msku: msku.to_string(),
                    confidence: score,
                    method: MappingMethod::Auto,
                };
                log::info!("auto-mapped SKU {sku} to MSKU {msku} (score {score})");
                mappings.upsert(mapping.clone());
                auto_mapped.push(mapping);
            } else {
                log::warn!(
                    "SKU {sku} unmapped, requires manual mapping (best {msku} at {score} < {})",
                    self.threshold
                );
                unmapped.push(UnmappedSku {
                    local_sku: sku.to_string(),
                    reason: UnmappedReason::BelowThreshold,
                    best_candidate: Some(msku.to_string()),
                    best_score: Some(score),
                });
            }
        }

        Ok(MatchOutcome {
            mappings,
            auto_mapped,
            unmapped,
            already_mapped,
        })
    }

    /// Operator override. Replaces any prior mapping for `local_sku`.
    /// On error the mapping set is left unchanged.
    pub fn assign(
        &self,
        catalog: &Catalog,
        mappings: &mut MappingSet,
        local_sku: &str,
        msku: &str,
    ) -> Result<SkuMapping, ReconError> {
        let local_sku = local_sku.trim();
        if local_sku.is_empty() {
            return Err(ReconError::BlankSku);
        }
        if !catalog.contains(msku) {
            return Err(ReconError::UnknownMsku { msku: msku.to_string() });
        }

        let mapping = SkuMapping {
            local_sku: local_sku.to_string(),
            msku: msku.to_string(),
            confidence: self.manual_confidence,
            method: MappingMethod::Manual,
        };
        match mappings.upsert(mapping.clone()) {
            Some(prev) if prev.msku != msku || prev.method != MappingMethod::Manual => {
                log::info!(
                    "manually mapped SKU {local_sku} to MSKU {msku} (was {} via {})",
                    prev.msku,
                    prev.method
                );
            }
            Some(_) => {}
            None => log::info!("manually mapped SKU {local_sku} to MSKU {msku}"),
        }
        Ok(mapping)
    }
}

/// Same behaviour as `Matcher::from_config(&MatcherConfig::default())`.
impl Default for Matcher {
    fn default() -> Self {
        let config = MatcherConfig::default();
        Self {
            threshold: config.threshold,
            similarity: Box::new(config.metric),
            sku_pattern: Regex::new(DEFAULT_SKU_PATTERN).ok(),
            manual_confidence: config.manual_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MasterRecord;

    fn catalog(mskus: &[&str]) -> Catalog {
        Catalog::from_records(mskus.iter().map(|m| MasterRecord::new(*m, 10, "MAIN"))).unwrap()
    }

    fn matcher() -> Matcher {
        Matcher::from_config(&MatcherConfig::default()).unwrap()
    }

    /// Scores every pair the same, to exercise tie-breaking.
    struct Flat(u8);

    impl Similarity for Flat {
        fn score(&self, _: &str, _: &str) -> u8 {
            self.0
        }
    }

    #[test]
    fn default_matcher_checks_sku_format_like_default_config() {
        let cat = catalog(&["APPLE_GOLD"]);
        for m in [Matcher::default(), matcher()] {
            let outcome = m.match_skus(&cat, ["golden apple!"], &MappingSet::new()).unwrap();
            assert_eq!(outcome.unmapped[0].reason, UnmappedReason::InvalidFormat);
            assert_eq!(m.threshold(), 80);
            assert_eq!(m.manual_confidence(), 100);
        }
    }

    #[test]
    fn empty_catalog_is_fatal() {
        let err = matcher()
            .match_skus(&Catalog::default(), ["GLD"], &MappingSet::new())
            .unwrap_err();
        assert_eq!(err, ReconError::EmptyCatalog);
    }

    #[test]
    fn no_observed_skus_is_fine() {
        let out = matcher()
            .match_skus(&catalog(&["APPLE_GOLD"]), std::iter::empty(), &MappingSet::new())
            .unwrap();
        assert!(out.mappings.is_empty());
        assert!(out.is_complete());
    }

    #[test]
    fn above_threshold_auto_maps() {
        let out = matcher()
            .match_skus(&catalog(&["APPLE_GOLD", "PEAR_GREEN"]), ["Golden_Apple"], &MappingSet::new())
            .unwrap();
        assert_eq!(out.auto_mapped.len(), 1);
        let m = out.mappings.get("Golden_Apple").unwrap();
        assert_eq!(m.msku, "APPLE_GOLD");
        assert_eq!(m.method, MappingMethod::Auto);
        assert_eq!(m.confidence, 83);
    }

    #[test]
    fn below_threshold_is_surfaced_not_guessed() {
        let out = matcher()
            .match_skus(&catalog(&["APPLE_GOLD"]), ["ZZZ999"], &MappingSet::new())
            .unwrap();
        assert!(out.mappings.is_empty());
        assert_eq!(out.unmapped.len(), 1);
        assert_eq!(out.unmapped[0].reason, UnmappedReason::BelowThreshold);
        assert_eq!(out.unmapped[0].best_candidate.as_deref(), Some("APPLE_GOLD"));
        assert!(!out.is_complete());
    }

    #[test]
    fn threshold_is_inclusive() {
        let m = Matcher::with_similarity(80, Box::new(Flat(80)));
        let out = m.match_skus(&catalog(&["A"]), ["x"], &MappingSet::new()).unwrap();
        assert_eq!(out.mappings.resolve("x"), Some("A"));

        let m = Matcher::with_similarity(80, Box::new(Flat(79)));
        let out = m.match_skus(&catalog(&["A"]), ["x"], &MappingSet::new()).unwrap();
        assert!(out.mappings.is_empty());
    }

    #[test]
    fn tie_goes_to_smallest_msku_regardless_of_load_order() {
        let m = Matcher::with_similarity(50, Box::new(Flat(90)));
        for order in [["B_ITEM", "A_ITEM", "C_ITEM"], ["C_ITEM", "B_ITEM", "A_ITEM"]] {
            let out = m.match_skus(&catalog(&order), ["sku"], &MappingSet::new()).unwrap();
            assert_eq!(out.mappings.resolve("sku"), Some("A_ITEM"));
        }
    }

    #[test]
    fn invalid_format_is_not_scored() {
        let out = matcher()
            .match_skus(&catalog(&["APPLE_GOLD"]), ["APPLE GOLD!"], &MappingSet::new())
            .unwrap();
        assert!(out.mappings.is_empty());
        assert_eq!(out.unmapped[0].reason, UnmappedReason::InvalidFormat);
        assert_eq!(out.unmapped[0].best_score, None);
    }

    #[test]
    fn rerun_keeps_manual_assignments() {
        let cat = catalog(&["APPLE_GOLD", "APPLE_RED"]);
        let m = matcher();
        let mut existing = MappingSet::new();
        m.assign(&cat, &mut existing, "APPLE-GOLD", "APPLE_RED").unwrap();

        let out = m.match_skus(&cat, ["APPLE-GOLD"], &existing).unwrap();
        let mapping = out.mappings.get("APPLE-GOLD").unwrap();
        assert_eq!(mapping.method, MappingMethod::Manual);
        assert_eq!(mapping.msku, "APPLE_RED");
        assert_eq!(out.already_mapped, 1);
        assert!(out.auto_mapped.is_empty());
    }

    #[test]
    fn observed_duplicates_collapse() {
        let out = matcher()
            .match_skus(&catalog(&["APPLE_GOLD"]), ["APPLE-GOLD", "APPLE-GOLD"], &MappingSet::new())
            .unwrap();
        assert_eq!(out.auto_mapped.len(), 1);
    }

    #[test]
    fn assign_overrides_auto_mapping() {
        let cat = catalog(&["APPLE_GOLD", "APPLE_RED"]);
        let m = matcher();
        let out = m.match_skus(&cat, ["APPLE-GOLD"], &MappingSet::new()).unwrap();
        let mut mappings = out.mappings;
        assert_eq!(mappings.get("APPLE-GOLD").unwrap().confidence, 100);

        let assigned = m.assign(&cat, &mut mappings, "APPLE-GOLD", "APPLE_RED").unwrap();
        assert_eq!(assigned.method, MappingMethod::Manual);
        assert_eq!(assigned.confidence, 100);
        assert_eq!(mappings.resolve("APPLE-GOLD"), Some("APPLE_RED"));
        assert_eq!(mappings.len(), 1);
    }

    #[test]
    fn assign_unknown_msku_leaves_set_unchanged() {
        let cat = catalog(&["APPLE_GOLD"]);
        let m = matcher();
        let mut mappings = MappingSet::new();
        m.assign(&cat, &mut mappings, "X", "APPLE_GOLD").unwrap();
        let before = mappings.clone();

        let err = m.assign(&cat, &mut mappings, "X", "UNKNOWN_MSKU").unwrap_err();
        assert_eq!(err, ReconError::UnknownMsku { msku: "UNKNOWN_MSKU".into() });
        assert_eq!(mappings, before);
    }

    #[test]
    fn assign_rejects_blank_sku() {
        let cat = catalog(&["APPLE_GOLD"]);
        let err = matcher().assign(&cat, &mut MappingSet::new(), "  ", "APPLE_GOLD").unwrap_err();
        assert_eq!(err, ReconError::BlankSku);
    }

    #[test]
    fn assign_uses_configured_sentinel() {
        let config = MatcherConfig { manual_confidence: 99, ..MatcherConfig::default() };
        let m = Matcher::from_config(&config).unwrap();
        let cat = catalog(&["APPLE_GOLD"]);
        let mapping = m.assign(&cat, &mut MappingSet::new(), "GLD", "APPLE_GOLD").unwrap();
        assert_eq!(mapping.confidence, 99);
    }

    #[test]
    fn suggestions_rank_by_score_then_name() {
        let cat = catalog(&["APPLE_GOLD", "APPLE_GREEN", "PEAR"]);
        let s = matcher().suggestions(&cat, "APPLE_GOLDD", 2);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].0, "APPLE_GOLD");
    }
}
