use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::{Serialize, Serializer};

use crate::error::LedgerError;
use crate::table::{round2, Table, Value};

pub const TOTAL_AMOUNT: &str = "Total Amount";
pub const COUNT: &str = "Count";

// ---------------------------------------------------------------------------
// Dimension values
// ---------------------------------------------------------------------------

/// A grouping value. Blank cells form their own `Missing` group, which sorts
/// after every present value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DimValue {
    Present(String),
    Missing,
}

impl DimValue {
    pub fn from_value(value: &Value) -> Self {
        if value.is_empty() {
            DimValue::Missing
        } else {
            DimValue::Present(value.raw_display())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DimValue::Present(s) => Some(s),
            DimValue::Missing => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DimValue::Present(s) => Value::Text(s.clone()),
            DimValue::Missing => Value::Empty,
        }
    }
}

impl From<&str> for DimValue {
    fn from(s: &str) -> Self {
        DimValue::Present(s.to_string())
    }
}

impl Serialize for DimValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DimValue::Present(s) => serializer.serialize_str(s),
            DimValue::Missing => serializer.serialize_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub dimensions: Vec<String>,
    pub amount_column: String,
    /// Top-level category column. Percentages are reported when it is grouped
    /// on together with at least one other dimension.
    pub category_column: Option<String>,
}

impl AggregateRequest {
    pub fn new<S: Into<String>>(dimensions: impl IntoIterator<Item = S>, amount_column: impl Into<String>) -> Self {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            amount_column: amount_column.into(),
            category_column: None,
        }
    }

    pub fn with_category(mut self, category_column: impl Into<String>) -> Self {
        self.category_column = Some(category_column.into());
        self
    }

    /// Reject dimension lists that can't be computed, before touching data.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_dimensions(&self.dimensions, &self.amount_column)
    }

    fn category_position(&self) -> Option<usize> {
        let cat = self.category_column.as_deref()?;
        self.dimensions.iter().position(|d| d == cat)
    }
}

pub(crate) fn validate_dimensions(dimensions: &[String], amount_column: &str) -> Result<(), LedgerError> {
    if dimensions.is_empty() {
        return Err(LedgerError::invalid_dimension("", "at least one grouping dimension is required"));
    }
    let mut seen = HashSet::new();
    for dim in dimensions {
        if dim == amount_column {
            return Err(LedgerError::invalid_dimension(dim, "dimension is the amount column"));
        }
        if !seen.insert(dim.as_str()) {
            return Err(LedgerError::invalid_dimension(dim, "dimension selected more than once"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub values: Vec<DimValue>,
    pub total: f64,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_of_category: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub dimensions: Vec<String>,
    pub amount_column: String,
    /// Set only when rows carry a percentage-of-category value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_column: Option<String>,
    pub rows: Vec<AggregateRow>,
}

impl Aggregation {
    pub fn has_percentages(&self) -> bool {
        self.category_column.is_some()
    }

    pub fn percentage_column(&self) -> Option<String> {
        self.category_column.as_ref().map(|c| format!("Percentage of {c}"))
    }

    pub fn grand_total(&self) -> f64 {
        self.rows.iter().map(|r| r.total).sum()
    }

    pub fn record_count(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Flatten to a table: dimensions, `Total Amount`, `Count`, and the
    /// percentage column when present.
    pub fn to_table(&self, name: &str) -> Result<Table, LedgerError> {
        let mut columns: Vec<String> = self.dimensions.clone();
        columns.push(TOTAL_AMOUNT.into());
        columns.push(COUNT.into());
        let pct_col = self.percentage_column();
        if let Some(ref c) = pct_col {
            columns.push(c.clone());
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Value> = row.values.iter().map(DimValue::to_value).collect();
                cells.push(Value::Number(row.total));
                cells.push(row.count.into());
                if pct_col.is_some() {
                    cells.push(row.percentage_of_category.into());
                }
                cells
            })
            .collect();
        Table::from_rows(name, columns, rows)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Amount of one cell, counting unparseable non-blank text.
pub(crate) fn amount_of(value: &Value, unparseable: &mut usize) -> Option<f64> {
    let n = value.as_number();
    if n.is_none() && !value.is_empty() {
        *unparseable += 1;
    }
    n
}

/// Group `table` by the requested dimensions and sum the amount column.
pub fn aggregate(table: &Table, request: &AggregateRequest) -> Result<Aggregation, LedgerError> {
    request.validate()?;

    let dim_idx: Vec<usize> = request
        .dimensions
        .iter()
        .map(|d| table.column_index(d))
        .collect::<Result<_, _>>()?;
    let amount_idx = table.column_index(&request.amount_column)?;

    let cat_pos = request.category_position();
    let with_pct = cat_pos.is_some() && request.dimensions.len() > 1;

    let mut groups: BTreeMap<Vec<DimValue>, (f64, usize)> = BTreeMap::new();
    let mut category_totals: BTreeMap<DimValue, f64> = BTreeMap::new();
    let mut unparseable = 0usize;

    for row in table.rows() {
        let key: Vec<DimValue> = dim_idx.iter().map(|&i| DimValue::from_value(&row[i])).collect();
        let amount = amount_of(&row[amount_idx], &mut unparseable).unwrap_or(0.0);

        if let Some(p) = cat_pos {
            *category_totals.entry(key[p].clone()).or_insert(0.0) += amount;
        }

        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    if unparseable > 0 {
        log::warn!(
            "table '{}': {unparseable} non-numeric '{}' value(s) treated as missing",
            table.name,
            request.amount_column
        );
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(values, (total, count))| {
            let percentage_of_category = if with_pct {
                let cat = &values[cat_pos.unwrap_or(0)];
                let cat_total = category_totals.get(cat).copied().unwrap_or(0.0);
                Some(percentage(total, cat_total))
            } else {
                None
            };
            AggregateRow {
                values,
                total,
                count,
                percentage_of_category,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        let by_category = match cat_pos {
            Some(p) => a.values[p].cmp(&b.values[p]),
            None => Ordering::Equal,
        };
        by_category
            .then_with(|| b.total.total_cmp(&a.total))
            .then_with(|| a.values.cmp(&b.values))
    });

    Ok(Aggregation {
        dimensions: request.dimensions.clone(),
        amount_column: request.amount_column.clone(),
        category_column: if with_pct { request.category_column.clone() } else { None },
        rows,
    })
}

/// `part / whole × 100`, two decimals; a zero whole yields 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        round2(part / whole * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
