use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty taxonomy, duplicate keep-list entry, etc.).
    ConfigValidation(String),
    /// A configured source with no table supplied for it.
    MissingInput(String),
    /// Required column absent from an input table.
    MissingColumn { table: String, column: String },
    /// A row whose cell count doesn't match the table's header count.
    RowWidth { table: String, expected: usize, found: usize },
    /// Aggregation or tabulation dimension that cannot be used.
    InvalidDimension { dimension: String, reason: String },
    /// Keep-list tables that were never produced upstream.
    Assembly { missing: Vec<String> },
    /// The output sink rejected a table.
    Sink(String),
}

impl LedgerError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn invalid_dimension(dimension: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDimension {
            dimension: dimension.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable category, used by callers to pick exit codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) => "config",
            Self::MissingInput(_) => "input",
            Self::MissingColumn { .. } | Self::RowWidth { .. } => "schema",
            Self::InvalidDimension { .. } => "invalid_dimension",
            Self::Assembly { .. } => "assembly",
            Self::Sink(_) => "sink",
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingInput(source) => write!(f, "no input tables for source '{source}'"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::RowWidth { table, expected, found } => {
                write!(f, "table '{table}': row has {found} cells, expected {expected}")
            }
            Self::InvalidDimension { dimension, reason } => {
                write!(f, "invalid dimension '{dimension}': {reason}")
            }
            Self::Assembly { missing } => {
                write!(f, "report assembly failed: missing table(s) {}", missing.join(", "))
            }
            Self::Sink(msg) => write!(f, "output sink error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}
