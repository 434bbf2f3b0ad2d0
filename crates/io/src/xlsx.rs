// Excel import (xlsx, xls, xlsb, ods) and xlsx export

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, Timelike};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use poledger_recon::{LedgerError, Table, TableSet, TableSink, Value};

use crate::error::IoError;
use crate::render::{render_table, RenderOptions};
use crate::shape::table_from_rows;

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, IoError> {
    let workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::read(path, e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Import one sheet as a table (first row = headers). `None` picks the first
/// sheet. The table is named after the sheet.
pub fn import_sheet(path: &Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::read(path, e))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let name = match sheet {
        Some(s) if names.iter().any(|n| n == s) => s.to_string(),
        Some(s) => {
            return Err(IoError::SheetNotFound {
                path: path.to_path_buf(),
                sheet: s.to_string(),
                available: names,
            })
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| IoError::parse(path, "workbook contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IoError::parse(path, format!("sheet '{name}': {e}")))?;

    let rows = range.rows().map(|row| row.iter().map(cell_value).collect::<Vec<_>>());
    table_from_rows(&name, rows).map_err(|e| IoError::parse(path, format!("sheet '{name}': {e}")))
}

/// Import every sheet. Sheets without a header row come back as empty tables.
pub fn import_all(path: &Path) -> Result<Vec<Table>, IoError> {
    let mut tables = Vec::new();
    for name in sheet_names(path)? {
        match import_sheet(path, Some(&name)) {
            Ok(t) => tables.push(t),
            Err(IoError::Parse { .. }) => tables.push(Table::new(name, Vec::<String>::new())),
            Err(e) => return Err(e),
        }
    }
    Ok(tables)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.trim().is_empty() => Value::Empty,
        Data::String(s) => Value::text(s.trim()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Value::text(format!("#{:?}", e)),
        Data::DateTime(dt) => Value::text(serial_to_text(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::text(s.clone()),
    }
}

/// Excel serial date (1900 system) as ISO text: date only at midnight,
/// otherwise date and time.
fn serial_to_text(serial: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let millis = (serial * 86_400_000.0).round() as i64;
    match epoch.and_then(|e| e.checked_add_signed(Duration::milliseconds(millis))) {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => serial.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Workbook sink
// ---------------------------------------------------------------------------

/// Buffers tables and writes them as one xlsx workbook on [`XlsxSink::save`],
/// one sheet per table in write order.
pub struct XlsxSink {
    path: PathBuf,
    render: RenderOptions,
    tables: TableSet,
}

impl XlsxSink {
    /// Sink for a new workbook at `path`.
    pub fn new(path: &Path, render: RenderOptions) -> Self {
        Self {
            path: path.to_path_buf(),
            render,
            tables: TableSet::new(),
        }
    }

    /// Sink that starts out holding the sheets of an existing workbook, so the
    /// output workbook can be rebuilt in place.
    pub fn open(path: &Path, render: RenderOptions) -> Result<Self, IoError> {
        let mut sink = Self::new(path, render);
        if path.exists() {
            for table in import_all(path)? {
                sink.tables.insert(table);
            }
            log::debug!("{}: opened with {} sheet(s)", path.display(), sink.tables.len());
        }
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the workbook. Returns the number of sheets written.
    pub fn save(&self) -> Result<usize, IoError> {
        let mut workbook = XlsxWorkbook::new();
        let header = Format::new().set_bold();

        for table in self.tables.iter() {
            let table = render_table(table, &self.render);
            let worksheet = workbook
                .add_worksheet()
                .set_name(&table.name)
                .map_err(|e| IoError::write(&self.path, format!("sheet '{}': {e}", table.name)))?;

            for (col, name) in table.columns().iter().enumerate() {
                worksheet
                    .write_string_with_format(0, col as u16, name, &header)
                    .map_err(|e| IoError::write(&self.path, e))?;
            }
            for (r, row) in table.rows().iter().enumerate() {
                let row32 = (r + 1) as u32;
                for (c, value) in row.iter().enumerate() {
                    let col16 = c as u16;
                    match value {
                        Value::Empty => {}
                        Value::Text(s) => {
                            worksheet
                                .write_string(row32, col16, s)
                                .map_err(|e| IoError::write(&self.path, e))?;
                        }
                        Value::Number(n) if n.is_finite() => {
                            worksheet
                                .write_number(row32, col16, *n)
                                .map_err(|e| IoError::write(&self.path, e))?;
                        }
                        Value::Number(_) => {}
                    }
                }
            }
            worksheet
                .set_freeze_panes(1, 0)
                .map_err(|e| IoError::write(&self.path, e))?;
        }

        workbook
            .save(&self.path)
            .map_err(|e| IoError::write(&self.path, e))?;
        log::info!("wrote {} sheet(s) to {}", self.tables.len(), self.path.display());
        Ok(self.tables.len())
    }
}

impl TableSink for XlsxSink {
    fn table_names(&self) -> Vec<String> {
        self.tables.names().map(String::from).collect()
    }

    fn write_table(&mut self, table: &Table) -> Result<(), LedgerError> {
        self.tables.insert(table.clone());
        Ok(())
    }

    fn discard_table(&mut self, name: &str) -> Result<(), LedgerError> {
        self.tables.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poledger_recon::report::assemble;
    use tempfile::tempdir;

    fn ledger() -> Table {
        Table::from_rows(
            "pc_overview AP",
            ["PO #", "PO Description", "Amount"],
            vec![
                vec![Value::Number(1001.0), Value::text("Mechanical ductwork"), Value::Number(12000.5)],
                vec![Value::text("A-2"), Value::Empty, Value::Number(-40.0)],
            ],
        )
        .unwrap()
    }

    fn breakdown() -> Table {
        Table::from_rows(
            "AP Analysis",
            ["PM Type", "Total Amount", "Count", "Percentage of PM Type"],
            vec![vec![Value::text("Mechanical"), Value::Number(150.0), Value::Number(2.0), Value::Number(62.5)]],
        )
        .unwrap()
    }

    #[test]
    fn test_xlsx_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut sink = XlsxSink::new(&path, RenderOptions::default());
        sink.write_table(&ledger()).unwrap();
        assert_eq!(sink.save().unwrap(), 1);

        let table = import_sheet(&path, None).unwrap();
        assert_eq!(table.name, "pc_overview AP");
        assert_eq!(table.columns(), ledger().columns());
        assert_eq!(table.rows(), ledger().rows());
    }

    #[test]
    fn test_text_cells_are_not_reparsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack.xlsx");
        let stack = Table::from_rows(
            "Stack",
            ["PO #", "Amount"],
            vec![
                vec![Value::text("0123"), Value::Number(10.0)],
                vec![Value::text("456"), Value::Number(20.0)],
            ],
        )
        .unwrap();

        let mut sink = XlsxSink::new(&path, RenderOptions::default());
        sink.write_table(&stack).unwrap();
        sink.save().unwrap();

        let table = import_sheet(&path, Some("Stack")).unwrap();
        assert_eq!(table.rows(), stack.rows());
    }

    #[test]
    fn test_percent_rendering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut sink = XlsxSink::new(&path, RenderOptions::default().with_percent_suffix());
        sink.write_table(&breakdown()).unwrap();
        sink.save().unwrap();

        let table = import_sheet(&path, Some("AP Analysis")).unwrap();
        assert_eq!(table.rows()[0][1], Value::Number(150.0));
        assert_eq!(table.rows()[0][3], Value::text("62.50%"));
    }

    #[test]
    fn test_sheet_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut sink = XlsxSink::new(&path, RenderOptions::default());
        sink.write_table(&ledger()).unwrap();
        sink.save().unwrap();

        match import_sheet(&path, Some("Stack")) {
            Err(IoError::SheetNotFound { sheet, available, .. }) => {
                assert_eq!(sheet, "Stack");
                assert_eq!(available, vec!["pc_overview AP"]);
            }
            other => panic!("expected SheetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_reopen_and_assemble_drops_stale_sheets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut first = XlsxSink::new(&path, RenderOptions::default());
        first.write_table(&Table::new("Sheet1", ["x"])).unwrap();
        first.write_table(&ledger()).unwrap();
        first.save().unwrap();

        let mut sink = XlsxSink::open(&path, RenderOptions::default()).unwrap();
        assert_eq!(sink.table_names(), vec!["Sheet1", "pc_overview AP"]);

        let produced: TableSet = [ledger(), breakdown()].into_iter().collect();
        assemble(&produced, &["AP Analysis", "pc_overview AP"], &mut sink).unwrap();
        sink.save().unwrap();

        assert_eq!(sheet_names(&path).unwrap(), vec!["pc_overview AP", "AP Analysis"]);
    }

    #[test]
    fn test_overlong_sheet_name_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut sink = XlsxSink::new(&path, RenderOptions::default());
        sink.write_table(&Table::new("A sheet name well beyond the Excel limit", ["x"])).unwrap();
        assert!(matches!(sink.save(), Err(IoError::Write { .. })));
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(serial_to_text(45292.0), "2024-01-01");
        assert_eq!(serial_to_text(45292.5), "2024-01-01 12:00:00");
    }
}
