//! CSV in/out for catalogs, sales exports, mappings and inventory.
//!
//! Callers hand in file contents and get strings back; reading and writing
//! files is the caller's job.

use csv::StringRecord;

use crate::config::{CatalogConfig, SalesColumns};
use crate::error::ReconError;
use crate::ledger::SalesBatch;
use crate::model::{Catalog, MappingMethod, MappingSet, MasterRecord, SalesRecord, SkuMapping};

pub const MAPPING_SKU_COLUMN: &str = "SKU";
pub const MAPPING_MSKU_COLUMN: &str = "MSKU";
pub const MAPPING_METHOD_COLUMN: &str = "Method";
pub const MAPPING_CONFIDENCE_COLUMN: &str = "Confidence";

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

struct Table {
    source: String,
    headers: Vec<String>,
    reader: csv::Reader<std::io::Cursor<Vec<u8>>>,
}

impl Table {
    fn open(source: &str, csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(std::io::Cursor::new(csv_data.as_bytes().to_vec()));

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Io(format!("{source}: {e}")))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        Ok(Self {
            source: source.to_string(),
            headers,
            reader,
        })
    }

    fn column(&self, name: &str) -> Result<usize, ReconError> {
        self.optional_column(name).ok_or_else(|| ReconError::MissingColumn {
            source: self.source.clone(),
            column: name.into(),
        })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Data rows with their 1-based file line.
    fn rows(&mut self) -> Result<Vec<(u64, StringRecord)>, ReconError> {
        let mut rows = Vec::new();
        for record in self.reader.records() {
            let record = record.map_err(|e| ReconError::Io(format!("{}: {e}", self.source)))?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            rows.push((line, record));
        }
        Ok(rows)
    }
}

fn required<'r>(
    source: &str,
    record: &'r StringRecord,
    line: u64,
    idx: usize,
    column: &str,
) -> Result<&'r str, ReconError> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ReconError::MissingValue {
            source: source.into(),
            line,
            column: column.into(),
        }),
    }
}

fn parse_quantity(source: &str, line: u64, value: &str) -> Result<u64, ReconError> {
    value.parse().map_err(|_| ReconError::QuantityParse {
        source: source.into(),
        line,
        value: value.into(),
    })
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Parse the master catalog. Duplicate MSKUs abort the load.
pub fn load_catalog_csv(source: &str, csv_data: &str, config: &CatalogConfig) -> Result<Catalog, ReconError> {
    let mut table = Table::open(source, csv_data)?;
    let cols = &config.columns;
    let msku_idx = table.column(&cols.msku)?;
    let quantity_idx = table.column(&cols.quantity)?;
    let center_idx = table.column(&cols.fulfillment_center)?;

    let mut records = Vec::new();
    for (line, record) in table.rows()? {
        let msku = required(source, &record, line, msku_idx, &cols.msku)?;
        let quantity = required(source, &record, line, quantity_idx, &cols.quantity)?;
        let center = required(source, &record, line, center_idx, &cols.fulfillment_center)?;

        if !config.allows_center(center) {
            return Err(ReconError::UnknownFulfillmentCenter {
                msku: msku.into(),
                center: center.into(),
            });
        }

        records.push(MasterRecord::new(msku, parse_quantity(source, line, quantity)?, center));
    }

    let catalog = Catalog::from_records(records)?;
    log::info!("loaded {} master SKU(s) from {source}", catalog.len());
    Ok(catalog)
}

/// Parse one sales export into a batch. Quantities must be positive.
pub fn load_sales_csv(source_file: &str, csv_data: &str, columns: &SalesColumns) -> Result<SalesBatch, ReconError> {
    let mut table = Table::open(source_file, csv_data)?;
    let sku_idx = table.column(&columns.sku)?;
    let quantity_idx = table.column(&columns.quantity)?;

    let mut records = Vec::new();
    for (line, record) in table.rows()? {
        let sku = required(source_file, &record, line, sku_idx, &columns.sku)?;
        let value = required(source_file, &record, line, quantity_idx, &columns.quantity)?;
        let quantity = parse_quantity(source_file, line, value)?;
        if quantity == 0 {
            return Err(ReconError::QuantityParse {
                source: source_file.into(),
                line,
                value: value.into(),
            });
        }
        records.push(SalesRecord::new(sku, quantity, source_file));
    }

    log::info!("loaded {} sales row(s) from {source_file}", records.len());
    Ok(SalesBatch::new(source_file, records))
}

/// Parse a persisted mapping file.
///
/// `Method` and `Confidence` columns are optional. Rows without a method are
/// operator-approved state and load as manual with `manual_confidence`.
/// A later row for the same SKU replaces an earlier one.
pub fn load_mappings_csv(source: &str, csv_data: &str, manual_confidence: u8) -> Result<MappingSet, ReconError> {
    let mut table = Table::open(source, csv_data)?;
    let sku_idx = table.column(MAPPING_SKU_COLUMN)?;
    let msku_idx = table.column(MAPPING_MSKU_COLUMN)?;
    let method_idx = table.optional_column(MAPPING_METHOD_COLUMN);
    let confidence_idx = table.optional_column(MAPPING_CONFIDENCE_COLUMN);

    let mut mappings = MappingSet::new();
    for (line, record) in table.rows()? {
        let sku = required(source, &record, line, sku_idx, MAPPING_SKU_COLUMN)?;
        let msku = required(source, &record, line, msku_idx, MAPPING_MSKU_COLUMN)?;

        let invalid = |column: &str, value: &str| ReconError::InvalidValue {
            source: source.into(),
            line,
            column: column.into(),
            value: value.into(),
        };

        let method = match method_idx.and_then(|i| record.get(i)).filter(|v| !v.is_empty()) {
            Some(v) => MappingMethod::parse(v).ok_or_else(|| invalid(MAPPING_METHOD_COLUMN, v))?,
            None => MappingMethod::Manual,
        };

        let confidence = match confidence_idx.and_then(|i| record.get(i)).filter(|v| !v.is_empty()) {
            Some(v) => v
                .parse::<u8>()
                .ok()
                .filter(|c| *c <= 100)
                .ok_or_else(|| invalid(MAPPING_CONFIDENCE_COLUMN, v))?,
            None if method == MappingMethod::Manual => manual_confidence,
            None => {
                return Err(ReconError::MissingValue {
                    source: source.into(),
                    line,
                    column: MAPPING_CONFIDENCE_COLUMN.into(),
                })
            }
        };

        let replaced = mappings.upsert(SkuMapping {
            local_sku: sku.into(),
            msku: msku.into(),
            confidence,
            method,
        });
        if replaced.is_some() {
            log::warn!("{source}, line {line}: SKU {sku} mapped more than once; keeping the later row");
        }
    }

    Ok(mappings)
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ReconError> {
    let bytes = writer.into_inner().map_err(|e| ReconError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReconError::Io(e.to_string()))
}

/// `SKU,MSKU` per active mapping, optionally with `Method,Confidence`.
pub fn write_mappings_csv(mappings: &MappingSet, provenance: bool) -> Result<String, ReconError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let io = |e: csv::Error| ReconError::Io(e.to_string());

    if provenance {
        writer
            .write_record([MAPPING_SKU_COLUMN, MAPPING_MSKU_COLUMN, MAPPING_METHOD_COLUMN, MAPPING_CONFIDENCE_COLUMN])
            .map_err(io)?;
    } else {
        writer.write_record([MAPPING_SKU_COLUMN, MAPPING_MSKU_COLUMN]).map_err(io)?;
    }

    for m in mappings.iter() {
        if provenance {
            let method = m.method.to_string();
            let confidence = m.confidence.to_string();
            writer
                .write_record([m.local_sku.as_str(), m.msku.as_str(), method.as_str(), confidence.as_str()])
                .map_err(io)?;
        } else {
            writer.write_record([m.local_sku.as_str(), m.msku.as_str()]).map_err(io)?;
        }
    }

    finish(writer)
}

/// `MSKU,Available Quantity,Fulfillment Center` per catalog record.
pub fn write_inventory_csv(catalog: &Catalog) -> Result<String, ReconError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let io = |e: csv::Error| ReconError::Io(e.to_string());

    writer
        .write_record(["MSKU", "Available Quantity", "Fulfillment Center"])
        .map_err(io)?;
    for r in catalog.records() {
        let quantity = r.quantity.to_string();
        writer
            .write_record([r.msku.as_str(), quantity.as_str(), r.fulfillment_center.as_str()])
            .map_err(io)?;
    }

    finish(writer)
}
