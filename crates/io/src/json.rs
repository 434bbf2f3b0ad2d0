// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use poledger_recon::{LedgerError, Table, TableSet, TableSink};

use crate::error::IoError;
use crate::render::{render_table, RenderOptions};

/// Export tables as a JSON array of `{name, columns, rows}` objects. Empty
/// cells are `null`.
pub fn export(tables: &[Table], path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|e| IoError::write(path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, tables).map_err(|e| IoError::write(path, e))?;
    Ok(())
}

/// Buffers tables and writes them as one JSON document on [`JsonSink::save`].
pub struct JsonSink {
    path: PathBuf,
    render: RenderOptions,
    tables: TableSet,
}

impl JsonSink {
    pub fn new(path: &Path, render: RenderOptions) -> Self {
        Self {
            path: path.to_path_buf(),
            render,
            tables: TableSet::new(),
        }
    }

    pub fn save(&self) -> Result<usize, IoError> {
        let rendered: Vec<Table> = self.tables.iter().map(|t| render_table(t, &self.render)).collect();
        export(&rendered, &self.path)?;
        Ok(rendered.len())
    }
}

impl TableSink for JsonSink {
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
    use poledger_recon::Value;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");

        let table = Table::from_rows(
            "Combined PM Types",
            ["PM Type", "Total Amount", "Percentage"],
            vec![
                vec![Value::text("Mechanical"), Value::Number(150.0), Value::Number(75.0)],
                vec![Value::Empty, Value::Number(50.0), Value::Number(25.0)],
            ],
        )
        .unwrap();
        let mut sink = JsonSink::new(&path, RenderOptions::default().with_percent_suffix());
        sink.write_table(&table).unwrap();
        assert_eq!(sink.save().unwrap(), 1);

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(parsed[0]["name"], "Combined PM Types");
        assert_eq!(parsed[0]["columns"][2], "Percentage");
        assert_eq!(parsed[0]["rows"][0][1], 150.0);
        assert_eq!(parsed[0]["rows"][0][2], "75.00%");
        assert!(parsed[0]["rows"][1][0].is_null());
    }
}
