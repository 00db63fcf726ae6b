use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Matching requires at least one catalog entry.
    EmptyCatalog,
    /// An assignment or mapping references an MSKU that is not in the catalog.
    UnknownMsku { msku: String },
    /// The catalog lists the same MSKU more than once.
    DuplicateMasterKey { msku: String, row: usize },
    /// A catalog row names a fulfillment center outside the configured set.
    UnknownFulfillmentCenter { msku: String, center: String },
    /// A local SKU was empty after trimming.
    BlankSku,
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// A required cell is empty.
    MissingValue { source: String, line: u64, column: String },
    /// Quantity parse error (non-integer, negative, or zero sales quantity).
    QuantityParse { source: String, line: u64, value: String },
    /// A cell holds a value outside its allowed set (method, confidence).
    InvalidValue { source: String, line: u64, column: String, value: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, bad pattern, blank column).
    ConfigValidation(String),
    /// Applied-batch ledger could not be read or written.
    Ledger(String),
    /// CSV read/write error.
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCatalog => write!(f, "master catalog is empty; nothing to match against"),
            Self::UnknownMsku { msku } => write!(f, "unknown MSKU '{msku}'"),
            Self::DuplicateMasterKey { msku, row } => {
                write!(f, "duplicate MSKU '{msku}' in catalog (row {row})")
            }
            Self::UnknownFulfillmentCenter { msku, center } => {
                write!(f, "MSKU '{msku}': unknown fulfillment center '{center}'")
            }
            Self::BlankSku => write!(f, "local SKU must not be blank"),
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing column '{column}'")
            }
            Self::MissingValue { source, line, column } => {
                write!(f, "{source}, line {line}: empty value in column '{column}'")
            }
            Self::QuantityParse { source, line, value } => {
                write!(f, "{source}, line {line}: invalid quantity '{value}'")
            }
            Self::InvalidValue { source, line, column, value } => {
                write!(f, "{source}, line {line}: invalid {column} '{value}'")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Ledger(msg) => write!(f, "applied ledger error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
