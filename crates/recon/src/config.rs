use serde::Deserialize;

use crate::error::ReconError;
use crate::similarity::Metric;

/// SKUs outside this alphabet are never auto-matched.
pub const DEFAULT_SKU_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sales: SalesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherConfig {
    /// Minimum score (0-100) for an automatic mapping.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub metric: Metric,
    /// SKUs not matching this regex are never auto-mapped. Empty disables.
    #[serde(default = "default_sku_pattern")]
    pub sku_pattern: String,
    /// Confidence recorded on manual assignments.
    #[serde(default = "default_manual_confidence")]
    pub manual_confidence: u8,
}

fn default_threshold() -> u8 {
    80
}

fn default_sku_pattern() -> String {
    DEFAULT_SKU_PATTERN.to_string()
}

fn default_manual_confidence() -> u8 {
    100
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            metric: Metric::default(),
            sku_pattern: default_sku_pattern(),
            manual_confidence: default_manual_confidence(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog + Sales columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Allowed fulfillment centers. Empty accepts any value.
    #[serde(default)]
    pub fulfillment_centers: Vec<String>,
    #[serde(default)]
    pub columns: CatalogColumns,
}

impl CatalogConfig {
    pub fn allows_center(&self, center: &str) -> bool {
        self.fulfillment_centers.is_empty() || self.fulfillment_centers.iter().any(|c| c == center)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogColumns {
    #[serde(default = "default_msku_column")]
    pub msku: String,
    #[serde(default = "default_quantity_column")]
    pub quantity: String,
    #[serde(default = "default_center_column")]
    pub fulfillment_center: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            msku: default_msku_column(),
            quantity: default_quantity_column(),
            fulfillment_center: default_center_column(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesConfig {
    #[serde(default)]
    pub columns: SalesColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesColumns {
    #[serde(default = "default_sku_column")]
    pub sku: String,
    #[serde(default = "default_quantity_column")]
    pub quantity: String,
}

impl Default for SalesColumns {
    fn default() -> Self {
        Self {
            sku: default_sku_column(),
            quantity: default_quantity_column(),
        }
    }
}

fn default_msku_column() -> String {
    "MSKU".into()
}

fn default_sku_column() -> String {
    "SKU".into()
}

fn default_quantity_column() -> String {
    "Quantity".into()
}

fn default_center_column() -> String {
    "Fulfillment Center".into()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Add `Method` and `Confidence` columns to the mapping export. Without
    /// them every row reloads as manual, so turn this off only for files
    /// handed to other tools.
    #[serde(default = "default_mapping_provenance")]
    pub mapping_provenance: bool,
}

fn default_mapping_provenance() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { mapping_provenance: default_mapping_provenance() }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let m = &self.matcher;
        if m.threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "matcher.threshold must be 0-100, got {}",
                m.threshold
            )));
        }
        if m.manual_confidence > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "matcher.manual_confidence must be 0-100, got {}",
                m.manual_confidence
            )));
        }
        if !m.sku_pattern.is_empty() {
            regex::Regex::new(&m.sku_pattern).map_err(|e| {
                ReconError::ConfigValidation(format!("matcher.sku_pattern: {e}"))
            })?;
        }

        let columns = [
            ("catalog.columns.msku", &self.catalog.columns.msku),
            ("catalog.columns.quantity", &self.catalog.columns.quantity),
            ("catalog.columns.fulfillment_center", &self.catalog.columns.fulfillment_center),
            ("sales.columns.sku", &self.sales.columns.sku),
            ("sales.columns.quantity", &self.sales.columns.quantity),
        ];
        for (name, value) in columns {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{name} must not be blank")));
            }
        }

        if self.catalog.fulfillment_centers.iter().any(|c| c.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "catalog.fulfillment_centers must not contain blank names".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
