// Delimited ledger files: import, export, and a one-CSV-per-table sink

use std::path::{Path, PathBuf};

use poledger_recon::{LedgerError, Table, TableSink, Value};

use crate::error::IoError;
use crate::render::{render_table, RenderOptions};
use crate::shape::table_from_rows;

pub fn import(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter, &table_name(path)).map_err(|e| IoError::parse(path, e))
}

pub fn import_tsv(path: &Path) -> Result<Table, IoError> {
    import_with_delimiter(path, b'\t')
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter, &table_name(path)).map_err(|e| IoError::parse(path, e))
}

/// Table name for a file: its stem.
pub(crate) fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Guess the separator of a ledger export from its first ten lines.
///
/// A candidate scores the header's field count times the number of sampled
/// lines that match it; a header it cannot split is not a candidate. Falls
/// back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
    let sample: Vec<&str> = content.lines().take(10).collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    let mut best = (b',', 0usize);
    for delim in CANDIDATES {
        let width = field_count(header, delim);
        if width <= 1 {
            continue;
        }
        let matching = sample.iter().filter(|line| field_count(line, delim) == width).count();
        if matching * width > best.1 {
            best = (delim, matching * width);
        }
    }
    best.0
}

/// Fields in one line split on `delim`, honouring quotes.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |r| r.len())
}

/// File contents as UTF-8 text without a byte-order mark. Bytes that are not
/// valid UTF-8 are decoded as Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::read(path, e))?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.trim_start_matches('\u{feff}').to_string()),
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            log::debug!("{}: not UTF-8, decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited text whose first record is the header row.
///
/// Short rows are padded with empty cells and trailing empty cells beyond the
/// header are dropped. Blank headers are named `Column N`.
pub fn import_from_string(content: &str, delimiter: u8, name: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(Value::from_input).collect());
    }

    table_from_rows(name, rows)
}

pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    export_with_delimiter(table, path, b',')
}

pub fn export_tsv(table: &Table, path: &Path) -> Result<(), IoError> {
    export_with_delimiter(table, path, b'\t')
}

fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| IoError::write(path, e))?;

    writer.write_record(table.columns()).map_err(|e| IoError::write(path, e))?;
    for row in table.rows() {
        let record: Vec<String> = row.iter().map(Value::raw_display).collect();
        writer.write_record(&record).map_err(|e| IoError::write(path, e))?;
    }

    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Directory sink
// ---------------------------------------------------------------------------

/// Writes each table as `<dir>/<name>.csv`.
///
/// Only files this sink wrote count as its tables; other files already in the
/// directory are never touched.
pub struct CsvDirSink {
    dir: PathBuf,
    render: RenderOptions,
    written: Vec<String>,
}

impl CsvDirSink {
    pub fn new(dir: &Path, render: RenderOptions) -> Result<Self, IoError> {
        std::fs::create_dir_all(dir).map_err(|e| IoError::write(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            render,
            written: Vec::new(),
        })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", file_safe(name)))
    }
}

/// Replace characters that aren't allowed in file names.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

impl TableSink for CsvDirSink {
    fn table_names(&self) -> Vec<String> {
        self.written.clone()
    }

    fn write_table(&mut self, table: &Table) -> Result<(), LedgerError> {
        let path = self.path_for(&table.name);
        export(&render_table(table, &self.render), &path)?;
        if !self.written.contains(&table.name) {
            self.written.push(table.name.clone());
        }
        Ok(())
    }

    fn discard_table(&mut self, name: &str) -> Result<(), LedgerError> {
        let path = self.path_for(name);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| IoError::write(&path, e))?;
        }
        self.written.retain(|n| n != name);
        Ok(())
    }
}
