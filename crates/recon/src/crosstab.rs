//! Pivot of amounts: row dimension × fixed column taxonomy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{amount_of, percentage, DimValue};
use crate::error::LedgerError;
use crate::table::{Table, Value};

pub const UNSPECIFIED: &str = "Unspecified";

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Fixed, ordered column labels. Values outside the set land in `unspecified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTaxonomy {
    pub labels: Vec<String>,
    #[serde(default = "default_unspecified")]
    pub unspecified: String,
}

fn default_unspecified() -> String {
    UNSPECIFIED.into()
}

impl ColumnTaxonomy {
    /// Taxonomy whose catch-all label is `Unspecified`, appended if absent.
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if !labels.iter().any(|l| l == UNSPECIFIED) {
            labels.push(UNSPECIFIED.into());
        }
        Self {
            labels,
            unspecified: UNSPECIFIED.into(),
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.labels.is_empty() {
            return Err(LedgerError::ConfigValidation("taxonomy has no labels".into()));
        }
        for (i, label) in self.labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(LedgerError::ConfigValidation(format!(
                    "taxonomy label #{} is blank",
                    i + 1
                )));
            }
            if self.labels[..i].contains(label) {
                return Err(LedgerError::ConfigValidation(format!(
                    "taxonomy label '{label}' listed twice"
                )));
            }
        }
        if !self.labels.contains(&self.unspecified) {
            return Err(LedgerError::ConfigValidation(format!(
                "taxonomy must include its unspecified label '{}'",
                self.unspecified
            )));
        }
        Ok(())
    }

    /// Column index for a raw cell. Null, blank, `"0"`, numeric zero and
    /// unknown labels map to the unspecified column.
    pub fn column_for(&self, value: &Value) -> usize {
        let label = match value {
            Value::Empty => None,
            Value::Number(n) if *n == 0.0 || n.is_nan() => None,
            Value::Number(_) => Some(value.raw_display()),
            Value::Text(s) => {
                let t = s.trim();
                if t.is_empty() || t == "0" {
                    None
                } else {
                    Some(t.to_string())
                }
            }
        };
        label
            .and_then(|l| self.labels.iter().position(|x| *x == l))
            .unwrap_or_else(|| self.unspecified_index())
    }

    fn unspecified_index(&self) -> usize {
        self.labels
            .iter()
            .position(|l| *l == self.unspecified)
            .unwrap_or(self.labels.len() - 1)
    }
}

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CrossTabRequest {
    pub row_column: String,
    pub column_column: String,
    pub amount_column: String,
}

impl CrossTabRequest {
    pub fn new(row_column: impl Into<String>, column_column: impl Into<String>, amount_column: impl Into<String>) -> Self {
        Self {
            row_column: row_column.into(),
            column_column: column_column.into(),
            amount_column: amount_column.into(),
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        for dim in [&self.row_column, &self.column_column] {
            if *dim == self.amount_column {
                return Err(LedgerError::invalid_dimension(dim, "dimension is the amount column"));
            }
        }
        if self.row_column == self.column_column {
            return Err(LedgerError::invalid_dimension(
                &self.column_column,
                "row and column dimension are the same column",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTabRow {
    pub label: DimValue,
    pub cells: Vec<f64>,
}

impl CrossTabRow {
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}

/// One pivot grid. `columns` is always the full taxonomy in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_dimension: String,
    pub columns: Vec<String>,
    pub rows: Vec<CrossTabRow>,
}

impl CrossTab {
    pub fn row(&self, label: &str) -> Option<&CrossTabRow> {
        self.rows.iter().find(|r| r.label.as_str() == Some(label))
    }

    pub fn to_table(&self, name: &str) -> Result<Table, LedgerError> {
        let mut columns = vec![self.row_dimension.clone()];
        columns.extend(self.columns.iter().cloned());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.label.to_value()];
                cells.extend(row.cells.iter().map(|&c| Value::Number(c)));
                cells
            })
            .collect();
        Table::from_rows(name, columns, rows)
    }
}

/// Raw amounts and their row-normalized percentages, identically shaped.
#[derive(Debug, Clone, Serialize)]
pub struct CrossTabulation {
    pub amounts: CrossTab,
    pub percentages: CrossTab,
}

// ---------------------------------------------------------------------------
// Tabulation
// ---------------------------------------------------------------------------

pub fn cross_tabulate(
    table: &Table,
    request: &CrossTabRequest,
    taxonomy: &ColumnTaxonomy,
) -> Result<CrossTabulation, LedgerError> {
    request.validate()?;
    taxonomy.validate()?;

    let row_idx = table.column_index(&request.row_column)?;
    let col_idx = table.column_index(&request.column_column)?;
    let amount_idx = table.column_index(&request.amount_column)?;

    let width = taxonomy.labels.len();
    let mut grid: BTreeMap<DimValue, Vec<f64>> = BTreeMap::new();
    let mut unparseable = 0usize;

    for row in table.rows() {
        let label = DimValue::from_value(&row[row_idx]);
        let column = taxonomy.column_for(&row[col_idx]);
        let amount = amount_of(&row[amount_idx], &mut unparseable).unwrap_or(0.0);
        grid.entry(label).or_insert_with(|| vec![0.0; width])[column] += amount;
    }

    if unparseable > 0 {
        log::warn!(
            "table '{}': {unparseable} non-numeric '{}' value(s) treated as missing",
            table.name,
            request.amount_column
        );
    }

    let amounts = CrossTab {
        row_dimension: request.row_column.clone(),
        columns: taxonomy.labels.clone(),
        rows: grid
            .into_iter()
            .map(|(label, cells)| CrossTabRow { label, cells })
            .collect(),
    };

    let percentages = CrossTab {
        row_dimension: amounts.row_dimension.clone(),
        columns: amounts.columns.clone(),
        rows: amounts
            .rows
            .iter()
            .map(|r| {
                let total = r.total();
                CrossTabRow {
                    label: r.label.clone(),
                    cells: r.cells.iter().map(|&c| percentage(c, total)).collect(),
                }
            })
            .collect(),
    };

    Ok(CrossTabulation { amounts, percentages })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
