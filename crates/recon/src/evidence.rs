use crate::model::{AppliedQuantity, ExcludedSalesWarning, OversoldWarning, ReconSummary};

/// Compute summary statistics from a reconciliation pass.
pub fn compute_summary(
    sales_records: usize,
    applied: &[AppliedQuantity],
    excluded: &[ExcludedSalesWarning],
    oversold: &[OversoldWarning],
    skipped_batches: usize,
) -> ReconSummary {
    ReconSummary {
        sales_records,
        applied_records: applied.iter().map(|a| a.record_count).sum(),
        quantity_applied: applied.iter().map(|a| a.quantity_sold).sum(),
        quantity_excluded: excluded.iter().map(|e| e.quantity).sum(),
        excluded_skus: excluded.len(),
        oversold_mskus: oversold.len(),
        skipped_batches,
        repeated_batches: 0,
    }
}
