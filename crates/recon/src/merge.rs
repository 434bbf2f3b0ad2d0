use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::LedgerError;
use crate::table::{Table, Value};

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Business-key column, present in both master and candidates.
    pub key_column: String,
    /// Candidate columns to carry into the master. `None` carries all of them.
    pub columns: Option<Vec<String>>,
}

impl MergeOptions {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            columns: None,
        }
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub table: Table,
    /// Candidate rows appended to the master.
    pub appended: usize,
    /// Candidate rows dropped because their key was already present.
    pub skipped: usize,
}

/// Comparable form of a business key: trimmed text, integral numbers without
/// a fraction, empty cells as "".
pub fn normalize_key(value: &Value) -> String {
    value.raw_display()
}

/// Extend `master` with the candidate rows whose key it doesn't hold yet.
///
/// Existing rows keep their order and content. New rows keep candidate order;
/// a key repeated within the candidates is appended once. Result columns are
/// the master's followed by any candidate-only columns, with `Empty` filling
/// cells a side doesn't have.
pub fn merge_ledger(
    master: &Table,
    candidates: &Table,
    options: &MergeOptions,
) -> Result<MergeOutcome, LedgerError> {
    let master_key = master.column_index(&options.key_column)?;
    let cand_key = candidates.column_index(&options.key_column)?;

    let carried: Vec<String> = match &options.columns {
        Some(cols) => {
            candidates.require_columns(cols)?;
            let mut cols = cols.clone();
            if !cols.contains(&options.key_column) {
                cols.insert(0, options.key_column.clone());
            }
            cols
        }
        None => candidates.columns().to_vec(),
    };

    let mut columns: Vec<String> = master.columns().to_vec();
    for c in &carried {
        if !columns.contains(c) {
            columns.push(c.clone());
        }
    }

    let cand_idx: HashMap<&str, usize> = candidates
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| carried.contains(c))
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut merged = Table::new(master.name.clone(), columns.iter().cloned());
    let extra = columns.len() - master.columns().len();

    let mut seen: HashSet<String> = HashSet::with_capacity(master.len() + candidates.len());
    for row in master.rows() {
        seen.insert(normalize_key(&row[master_key]));
        let mut out = row.clone();
        out.extend(std::iter::repeat(Value::Empty).take(extra));
        merged.push_row(out)?;
    }

    let mut appended = 0;
    let mut skipped = 0;
    for row in candidates.rows() {
        let key = normalize_key(&row[cand_key]);
        if !seen.insert(key) {
            skipped += 1;
            continue;
        }
        let out = columns
            .iter()
            .map(|c| {
                cand_idx
                    .get(c.as_str())
                    .map(|&i| row[i].clone())
                    .unwrap_or(Value::Empty)
            })
            .collect();
        merged.push_row(out)?;
        appended += 1;
    }

    log::debug!(
        "merge '{}' into '{}': {appended} appended, {skipped} already present",
        candidates.name,
        master.name
    );

    Ok(MergeOutcome {
        table: merged,
        appended,
        skipped,
    })
}

/// Merge several candidate tables in order. Schema of every input is checked
/// before any merging happens.
pub fn merge_all(
    master: &Table,
    candidates: &[Table],
    options: &MergeOptions,
) -> Result<MergeOutcome, LedgerError> {
    master.column_index(&options.key_column)?;
    for cand in candidates {
        cand.column_index(&options.key_column)?;
        if let Some(cols) = &options.columns {
            cand.require_columns(cols)?;
        }
    }

    let mut outcome = MergeOutcome {
        table: master.clone(),
        appended: 0,
        skipped: 0,
    };
    for cand in candidates {
        let step = merge_ledger(&outcome.table, cand, options)?;
        outcome = MergeOutcome {
            table: step.table,
            appended: outcome.appended + step.appended,
            skipped: outcome.skipped + step.skipped,
        };
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
