//! Sales batches and the record of which ones were already applied.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ReconError;
use crate::model::SalesRecord;

/// All rows from one sales export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesBatch {
    /// Digest of source label and rows. Two channels exporting the same
    /// rows are still two batches.
    pub batch_id: String,
    /// Digest of the rows alone; equal across renamed copies.
    pub content_digest: String,
    pub source_file: String,
    pub records: Vec<SalesRecord>,
}

impl SalesBatch {
    pub fn new(source_file: impl Into<String>, records: Vec<SalesRecord>) -> Self {
        let source_file = source_file.into();
        let content_digest = content_digest(&records);
        Self {
            batch_id: batch_id(&source_file, &content_digest),
            content_digest,
            source_file,
            records,
        }
    }

    pub fn total_quantity(&self) -> u64 {
        self.records.iter().map(|r| r.quantity).sum()
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.local_sku.as_str())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-256 over `(sku, quantity)` rows in order, hex encoded.
pub fn content_digest(records: &[SalesRecord]) -> String {
    let mut hasher = Sha256::new();
    for r in records {
        hasher.update(r.local_sku.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(r.quantity.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex(&hasher.finalize())
}

/// SHA-256 over the source label and the content digest, hex encoded.
pub fn batch_id(source_file: &str, content_digest: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_file.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(content_digest.as_bytes());
    hex(&hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBatch {
    pub batch_id: String,
    #[serde(default)]
    pub content_digest: String,
    pub source_file: String,
    pub record_count: usize,
    pub total_quantity: u64,
    /// Row indices excluded so far; retried on the next reconcile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_rows: Vec<usize>,
    pub applied_at: String,
}

impl AppliedBatch {
    /// Every row has reached inventory.
    pub fn is_settled(&self) -> bool {
        self.pending_rows.is_empty()
    }
}

/// Batches already decremented from inventory, with the rows still owed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedLedger {
    #[serde(default)]
    batches: Vec<AppliedBatch>,
}

impl AppliedLedger {
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        serde_json::from_str(input).map_err(|e| ReconError::Ledger(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(self).map_err(|e| ReconError::Ledger(e.to_string()))
    }

    pub fn get(&self, batch_id: &str) -> Option<&AppliedBatch> {
        self.batches.iter().find(|b| b.batch_id == batch_id)
    }

    pub fn contains(&self, batch_id: &str) -> bool {
        self.get(batch_id).is_some()
    }

    /// An applied batch from another source with the same rows as `batch`.
    pub fn same_content(&self, batch: &SalesBatch) -> Option<&AppliedBatch> {
        self.batches
            .iter()
            .find(|b| b.content_digest == batch.content_digest && b.batch_id != batch.batch_id)
    }

    /// Record `batch` as applied except for `pending_rows`. A batch recorded
    /// earlier keeps its `applied_at` and gets the new pending set.
    pub fn record(&mut self, batch: &SalesBatch, pending_rows: Vec<usize>) {
        if let Some(existing) = self.batches.iter_mut().find(|b| b.batch_id == batch.batch_id) {
            existing.pending_rows = pending_rows;
            return;
        }
        self.batches.push(AppliedBatch {
            batch_id: batch.batch_id.clone(),
            content_digest: batch.content_digest.clone(),
            source_file: batch.source_file.clone(),
            record_count: batch.records.len(),
            total_quantity: batch.total_quantity(),
            pending_rows,
            applied_at: chrono::Utc::now().to_rfc3339(),
        });
    }

    pub fn batches(&self) -> &[AppliedBatch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
