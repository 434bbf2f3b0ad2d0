//! Report assembly: emit exactly the keep-list tables to a sink.

use serde::Serialize;

use crate::error::LedgerError;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Produced tables
// ---------------------------------------------------------------------------

/// Named tables in production order. Inserting a name twice replaces the
/// earlier table in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(slot) => *slot = table,
            None => self.tables.push(table),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        let idx = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut set = TableSet::new();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Destination for output tables (a workbook, a directory, memory).
///
/// A sink may already hold tables before assembly starts, such as leftovers
/// from a previous run or defaults its format creates. Assembly removes them.
pub trait TableSink {
    fn table_names(&self) -> Vec<String>;
    fn write_table(&mut self, table: &Table) -> Result<(), LedgerError>;
    fn discard_table(&mut self, name: &str) -> Result<(), LedgerError>;
}

/// In-memory sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub tables: TableSet,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-populated with an empty default table, like a fresh workbook's
    /// `Sheet1`.
    pub fn with_default_table(name: &str) -> Self {
        let mut sink = Self::new();
        sink.tables.insert(Table::new(name, Vec::<String>::new()));
        sink
    }
}

impl TableSink for MemorySink {
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

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub written: Vec<String>,
    pub discarded: Vec<String>,
}

/// Tables of `produced` that are on the keep-list, in keep-list order.
/// Fails with every missing name if any keep-list table was never produced.
pub fn select<'a, S: AsRef<str>>(produced: &'a TableSet, keep: &[S]) -> Result<Vec<&'a Table>, LedgerError> {
    let missing: Vec<String> = keep
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !produced.contains(name))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::Assembly { missing });
    }
    Ok(keep
        .iter()
        .filter_map(|name| produced.get(name.as_ref()))
        .collect())
}

/// Write the keep-list tables to `sink`, then discard everything else the
/// sink holds. Nothing is written when a keep-list table is missing.
pub fn assemble<S: AsRef<str>>(
    produced: &TableSet,
    keep: &[S],
    sink: &mut dyn TableSink,
) -> Result<AssemblyReport, LedgerError> {
    let selected = select(produced, keep)?;

    let mut report = AssemblyReport::default();
    for table in selected {
        sink.write_table(table)?;
        report.written.push(table.name.clone());
    }

    let dropped = produced.names().filter(|n| !report.written.iter().any(|w| w == n)).count();
    for name in sink.table_names() {
        if !keep.iter().any(|k| k.as_ref() == name) {
            sink.discard_table(&name)?;
            report.discarded.push(name);
        }
    }

    log::info!(
        "assembled {} table(s); {dropped} intermediate table(s) not emitted, {} removed from sink",
        report.written.len(),
        report.discarded.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn produced() -> TableSet {
        ["pc_overview AP", "Combined PM Types", "scratch"]
            .into_iter()
            .map(|n| Table::new(n, ["a"]))
            .collect()
    }

    #[test]
    fn emits_exactly_keep_list() {
        let mut sink = MemorySink::with_default_table("Sheet1");
        let keep = ["Combined PM Types", "pc_overview AP"];
        let report = assemble(&produced(), &keep, &mut sink).unwrap();

        assert_eq!(report.written, vec!["Combined PM Types", "pc_overview AP"]);
        assert_eq!(report.discarded, vec!["Sheet1"]);
        let mut names = sink.table_names();
        names.sort();
        assert_eq!(names, vec!["Combined PM Types", "pc_overview AP"]);
    }

    #[test]
    fn missing_table_is_fatal_and_writes_nothing() {
        let mut sink = MemorySink::new();
        let keep = ["pc_overview AP", "Base-Build_breakdown", "Detailed Combined PM Types"];
        let err = assemble(&produced(), &keep, &mut sink).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Assembly {
                missing: vec!["Base-Build_breakdown".into(), "Detailed Combined PM Types".into()]
            }
        );
        assert!(sink.table_names().is_empty());
    }

    #[test]
    fn stale_sink_tables_are_removed() {
        let mut sink = MemorySink::new();
        sink.write_table(&Table::new("old output", ["x"])).unwrap();
        sink.write_table(&Table::new("pc_overview AP", ["stale"])).unwrap();
        assemble(&produced(), &["pc_overview AP"], &mut sink).unwrap();

        assert_eq!(sink.table_names(), vec!["pc_overview AP"]);
        assert_eq!(sink.tables.get("pc_overview AP").unwrap().columns(), &["a"]);
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut set = TableSet::new();
        set.insert(Table::new("t", ["a"]));
        set.insert(Table::new("u", ["a"]));
        set.insert(Table::new("t", ["b"]));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["t", "u"]);
        assert_eq!(set.get("t").unwrap().columns(), &["b"]);
    }
}
