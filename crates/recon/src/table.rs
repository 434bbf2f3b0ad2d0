//! In-memory tabular data: named columns, row-aligned cells.
//!
//! This is the only shape the pipeline consumes and produces. Readers and
//! writers for concrete file formats live outside this crate.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::LedgerError;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Value {
    /// Interpret raw cell text: blank → Empty, a number in canonical form →
    /// Number, else Text.
    ///
    /// Only text that prints back unchanged becomes a Number, so `"0123"`,
    /// `"12.50"` and `"1e3"` stay Text and keys keep their exact spelling.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(num) if num.is_finite() && format_number(num) == trimmed => Value::Number(num),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
        }
    }

    /// Numeric view of the cell. Text is parsed as a financial amount
    /// (`$1,234.50`, `(12.00)`); anything unparseable is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Number(_) | Value::Empty => None,
            Value::Text(s) => parse_financial_number(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Canonical string form. Integral numbers print without a fraction so
    /// `1001.0` and `"1001"` render identically.
    pub fn raw_display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => s.trim().to_string(),
            Value::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_display())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Empty)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse a financial number string:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if is_negative { -value } else { value })
}

/// Round to two decimal places (half away from zero).
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from headers and rows, rejecting ragged rows.
    pub fn from_rows<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, LedgerError> {
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), LedgerError> {
        if row.len() != self.columns.len() {
            return Err(LedgerError::RowWidth {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, LedgerError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LedgerError::missing_column(&self.name, name))
    }

    /// Check that every named column exists; reports the first absent one.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), LedgerError> {
        for name in names {
            self.column_index(name.as_ref())?;
        }
        Ok(())
    }

    pub fn cell(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    /// Iterate one column's cells in row order.
    pub fn column_values(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, LedgerError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Append a derived column, or overwrite it in place if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), LedgerError> {
        if values.len() != self.rows.len() {
            return Err(LedgerError::RowWidth {
                table: self.name.clone(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// New table with the same columns and only the rows `keep` accepts.
    pub fn filter_rows(&self, name: impl Into<String>, mut keep: impl FnMut(&[Value]) -> bool) -> Table {
        Table {
            name: name.into(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Same-shaped copy with every cell passed through `f` along with its
    /// column index.
    pub fn map_cells(&self, mut f: impl FnMut(usize, &Value) -> Value) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().enumerate().map(|(i, v)| f(i, v)).collect())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_classifies() {
        assert_eq!(Value::from_input("  "), Value::Empty);
        assert_eq!(Value::from_input("42"), Value::Number(42.0));
        assert_eq!(Value::from_input(" PO-7 "), Value::Text("PO-7".into()));
        assert_eq!(Value::from_input("NaN"), Value::Text("NaN".into()));
        assert_eq!(Value::from_input("-7.25"), Value::Number(-7.25));
    }

    #[test]
    fn from_input_keeps_non_canonical_numbers_as_text() {
        assert_eq!(Value::from_input("0123"), Value::text("0123"));
        assert_eq!(Value::from_input("12.50"), Value::text("12.50"));
        assert_eq!(Value::from_input("+5"), Value::text("+5"));
        assert_eq!(Value::from_input("1e3"), Value::text("1e3"));
        assert_eq!(Value::from_input("0"), Value::Number(0.0));
        // still usable as amounts
        assert_eq!(Value::from_input("12.50").as_number(), Some(12.5));
    }

    #[test]
    fn raw_display_drops_integral_fraction() {
        assert_eq!(Value::Number(1001.0).raw_display(), "1001");
        assert_eq!(Value::Number(12.5).raw_display(), "12.5");
        assert_eq!(Value::Text(" 1001 ".into()).raw_display(), "1001");
        assert_eq!(Value::Empty.raw_display(), "");
    }

    #[test]
    fn parse_financial_number_variants() {
        assert_eq!(parse_financial_number("$1,234.56"), Some(1234.56));
        assert_eq!(parse_financial_number("(100.00)"), Some(-100.0));
        assert_eq!(parse_financial_number(" -7 "), Some(-7.0));
        assert_eq!(parse_financial_number("N/A"), None);
        assert_eq!(parse_financial_number(""), None);
    }

    #[test]
    fn round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(-1.005_1), -1.01);
    }

    #[test]
    fn push_row_rejects_ragged() {
        let mut t = Table::new("t", ["a", "b"]);
        let err = t.push_row(vec![Value::Empty]).unwrap_err();
        assert!(matches!(err, LedgerError::RowWidth { expected: 2, found: 1, .. }));
    }

    #[test]
    fn set_column_appends_then_overwrites() {
        let mut t = Table::from_rows("t", ["a"], vec![vec!["x".into()], vec!["y".into()]]).unwrap();
        t.set_column("b", vec![1.0.into(), 2.0.into()]).unwrap();
        assert_eq!(t.columns(), &["a", "b"]);
        t.set_column("b", vec![3.0.into(), 4.0.into()]).unwrap();
        assert_eq!(t.columns().len(), 2);
        assert_eq!(t.cell(1, 1), &Value::Number(4.0));
    }

    #[test]
    fn map_cells_keeps_shape() {
        let t = Table::from_rows("t", ["a", "b"], vec![vec!["x".into(), 2.0.into()]]).unwrap();
        let out = t.map_cells(|col, v| if col == 1 { Value::text(v.raw_display()) } else { v.clone() });
        assert_eq!(out.name, "t");
        assert_eq!(out.columns(), t.columns());
        assert_eq!(out.rows()[0], vec![Value::text("x"), Value::text("2")]);
    }

    #[test]
    fn missing_column_names_table() {
        let t = Table::new("Stack", ["PO #"]);
        let err = t.require_columns(&["PO #", "Amount"]).unwrap_err();
        assert_eq!(err, LedgerError::missing_column("Stack", "Amount"));
    }

    #[test]
    fn serializes_empty_as_null() {
        let json = serde_json::to_string(&vec![Value::Empty, Value::Number(1.5), "a".into()]).unwrap();
        assert_eq!(json, r#"[null,1.5,"a"]"#);
    }
}
