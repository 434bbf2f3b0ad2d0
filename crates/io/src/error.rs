use std::fmt;
use std::path::{Path, PathBuf};

use poledger_recon::LedgerError;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Read { path: PathBuf, message: String },
    /// File was readable but its content is not a usable table.
    Parse { path: PathBuf, message: String },
    /// Workbook has no sheet with the requested name.
    SheetNotFound { path: PathBuf, sheet: String, available: Vec<String> },
    /// Extension this crate doesn't know how to read or write.
    UnsupportedFormat(PathBuf),
    /// Output could not be written.
    Write { path: PathBuf, message: String },
    /// Table-level problem surfaced while building a table.
    Table(LedgerError),
}

impl IoError {
    pub(crate) fn read(path: &Path, e: impl fmt::Display) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, e: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, e: impl fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "cannot parse {}: {message}", path.display()),
            Self::SheetNotFound { path, sheet, available } => write!(
                f,
                "{}: no sheet named '{sheet}' (available: {})",
                path.display(),
                available.join(", ")
            ),
            Self::UnsupportedFormat(path) => write!(f, "unsupported file format: {}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Table(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<LedgerError> for IoError {
    fn from(e: LedgerError) -> Self {
        Self::Table(e)
    }
}

impl From<IoError> for LedgerError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Table(inner) => inner,
            other => LedgerError::Sink(other.to_string()),
        }
    }
}
