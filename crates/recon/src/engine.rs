use crate::aggregate::resolve_sales;
use crate::evidence::compute_summary;
use crate::model::{AppliedQuantity, Catalog, MappingSet, OversoldWarning, ReconMeta, ReconResult, SalesRecord};

/// Apply `sales` to `catalog` through `mappings`.
///
/// Returns the next catalog snapshot; `catalog` itself is not touched.
/// Each MSKU is decremented once by the sum of its resolved sales and
/// clamped at zero. Unresolvable sales are excluded and reported.
///
/// Not idempotent: applying the same sales twice decrements twice. Use
/// [`crate::session::Session::reconcile`] for batch-level dedup.
pub fn reconcile(catalog: &Catalog, sales: &[SalesRecord], mappings: &MappingSet) -> ReconResult {
    let resolved = resolve_sales(sales, mappings, catalog);
    let mut next = catalog.successor();

    let mut applied = Vec::with_capacity(resolved.by_msku.len());
    let mut oversold = Vec::new();

    for (msku, total) in &resolved.by_msku {
        let Some(record) = next.get_mut(msku) else {
            continue;
        };
        let before = record.quantity;
        let after = before.saturating_sub(total.quantity);

        if total.quantity > before {
            log::warn!(
                "MSKU {msku} oversold: {} requested, {before} available; clamped to 0",
                total.quantity
            );
            oversold.push(OversoldWarning {
                msku: msku.clone(),
                fulfillment_center: record.fulfillment_center.clone(),
                available: before,
                requested: total.quantity,
                shortfall: total.quantity - before,
            });
        }

        record.quantity = after;
        log::info!("subtracted {} from MSKU {msku} ({before} -> {after})", total.quantity);

        applied.push(AppliedQuantity {
            msku: msku.clone(),
            fulfillment_center: record.fulfillment_center.clone(),
            quantity_before: before,
            quantity_sold: total.quantity,
            quantity_after: after,
            record_count: total.record_count,
        });
    }

    for ex in &resolved.excluded {
        log::warn!(
            "excluded {} unit(s) of SKU {} ({}) from {}",
            ex.quantity,
            ex.local_sku,
            ex.reason,
            ex.source_files.join(", ")
        );
    }

    let summary = compute_summary(sales.len(), &applied, &resolved.excluded, &oversold, 0);

    ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            catalog_version_before: catalog.version(),
            catalog_version_after: next.version(),
        },
        summary,
        catalog: next,
        applied,
        excluded: resolved.excluded,
        oversold,
        skipped_batches: Vec::new(),
        repeated_content: Vec::new(),
    }
}
