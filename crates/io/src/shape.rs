// Header and row shaping shared by the CSV and Excel readers

use poledger_recon::{Table, Value};

/// Column names from a header row. Blank headers become `Column N`;
/// repeated names are rejected since columns are addressed by name.
pub(crate) fn header_columns(cells: &[Value]) -> Result<Vec<String>, String> {
    let mut columns: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let h = cell.raw_display();
        let col = if h.is_empty() { format!("Column {}", i + 1) } else { h };
        if columns.contains(&col) {
            return Err(format!("duplicate column '{col}'"));
        }
        columns.push(col);
    }
    Ok(columns)
}

/// Fit a data row to the header width: pad short rows with empty cells, drop
/// trailing empty cells past the header. `line` is 1-based, for messages.
pub(crate) fn fit_row(mut row: Vec<Value>, width: usize, line: usize) -> Result<Vec<Value>, String> {
    if row.len() > width {
        if row[width..].iter().any(|v| !v.is_empty()) {
            return Err(format!("row {line} has {} fields, header has {width}", row.len()));
        }
        row.truncate(width);
    }
    row.resize(width, Value::Empty);
    Ok(row)
}

/// Build a table from raw rows whose first row is the header. Fully blank
/// data rows are skipped.
pub(crate) fn table_from_rows<I>(name: &str, rows: I) -> Result<Table, String>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or_else(|| "no header row".to_string())?;
    let columns = header_columns(&header)?;
    let width = columns.len();

    let mut table = Table::new(name, columns);
    for (i, row) in rows.enumerate() {
        if row.iter().all(Value::is_empty) {
            continue;
        }
        let row = fit_row(row, width, i + 2)?;
        table.push_row(row).map_err(|e| e.to_string())?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rows_skipped() {
        let t = table_from_rows(
            "t",
            vec![
                vec![Value::text("a"), Value::text("b")],
                vec![Value::Empty, Value::Empty],
                vec![Value::Number(1.0)],
            ],
        )
        .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0], vec![Value::Number(1.0), Value::Empty]);
    }

    #[test]
    fn numeric_header_is_text() {
        let cols = header_columns(&[Value::Number(2024.0), Value::text(" Total ")]).unwrap();
        assert_eq!(cols, vec!["2024", "Total"]);
    }
}
