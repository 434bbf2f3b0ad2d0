// Reading configured source tables from disk

use std::path::Path;

use poledger_recon::config::{PipelineConfig, TableRef};
use poledger_recon::{PipelineInput, SourceInput, Table};

use crate::error::IoError;

const EXCEL_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Read a table from a CSV/TSV file or a workbook sheet, picked by extension.
/// A sheet name is only meaningful for workbooks.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => {
            warn_sheet_ignored(path, sheet);
            crate::csv::import(path)
        }
        "tsv" | "tab" => {
            warn_sheet_ignored(path, sheet);
            crate::csv::import_tsv(path)
        }
        e if EXCEL_EXTENSIONS.contains(&e) => crate::xlsx::import_sheet(path, sheet),
        _ => Err(IoError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn warn_sheet_ignored(path: &Path, sheet: Option<&str>) {
    if let Some(s) = sheet {
        log::warn!("{}: sheet '{s}' ignored for delimited text", path.display());
    }
}

/// Read a configured table, resolving its file against `base_dir`.
pub fn read_table_ref(table_ref: &TableRef, base_dir: &Path) -> Result<Table, IoError> {
    let path = base_dir.join(&table_ref.file);
    let table = read_table(&path, table_ref.sheet.as_deref())?;
    log::debug!(
        "read '{}' from {}: {} row(s), {} column(s)",
        table.name,
        path.display(),
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Load every source's master and candidate tables.
pub fn load_input(config: &PipelineConfig, base_dir: &Path) -> Result<PipelineInput, IoError> {
    let mut input = PipelineInput::new();
    for (name, source) in &config.sources {
        let mut data = SourceInput::new(read_table_ref(&source.master, base_dir)?);
        for cand in &source.candidates {
            data = data.with_candidate(read_table_ref(cand, base_dir)?);
        }
        input = input.with_source(name.clone(), data);
    }
    Ok(input)
}
