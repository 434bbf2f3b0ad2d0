use std::collections::HashSet;

use crate::error::LedgerError;
use crate::merge::normalize_key;
use crate::table::{Table, Value};

/// Rows split by an exclusion key list.
#[derive(Debug, Clone)]
pub struct Exclusion {
    pub kept: Table,
    pub removed: Table,
}

/// Name given to the removed-rows table when the caller doesn't pick one.
pub fn removed_table_name(table: &str) -> String {
    format!("{table}_Removed")
}

/// Split `table` into rows whose key is not excluded and rows whose key is.
/// Keys are compared in normalized form, so `"4410"` excludes numeric `4410`.
pub fn exclude_keys<S: AsRef<str>>(
    table: &Table,
    key_column: &str,
    excluded: &[S],
) -> Result<Exclusion, LedgerError> {
    let key_idx = table.column_index(key_column)?;
    let excluded: HashSet<String> = excluded
        .iter()
        .map(|k| normalize_key(&Value::from_input(k.as_ref())))
        .collect();

    let is_excluded = |row: &[Value]| excluded.contains(&normalize_key(&row[key_idx]));
    let kept = table.filter_rows(table.name.clone(), |row| !is_excluded(row));
    let removed = table.filter_rows(removed_table_name(&table.name), is_excluded);

    if !removed.is_empty() {
        log::debug!("table '{}': excluded {} row(s)", table.name, removed.len());
    }

    Ok(Exclusion { kept, removed })
}
