// Presentation of numeric percentage cells as "12.34%" text

use std::collections::HashSet;

use poledger_recon::derived::{CUMULATIVE_PERCENTAGE, SHARE_OF_TOTAL};
use poledger_recon::{Table, Value};

pub fn format_percent(p: f64) -> String {
    format!("{p:.2}%")
}

/// Which cells a writer renders as percent text.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub percent_suffix: bool,
    /// Tables whose every column after the first is a percentage (cross-tab
    /// percentage tables).
    pub percent_tables: HashSet<String>,
}

impl RenderOptions {
    pub fn with_percent_suffix(mut self) -> Self {
        self.percent_suffix = true;
        self
    }

    pub fn with_percent_table(mut self, name: impl Into<String>) -> Self {
        self.percent_tables.insert(name.into());
        self
    }

    fn is_percent_cell(&self, table: &str, column_index: usize, column: &str) -> bool {
        if self.percent_tables.contains(table) {
            return column_index > 0;
        }
        is_percent_column(column)
    }
}

/// Percentage columns the pipeline produces by name.
pub fn is_percent_column(name: &str) -> bool {
    name.starts_with(SHARE_OF_TOTAL) || name == CUMULATIVE_PERCENTAGE
}

/// Copy of `table` with percentage cells rendered per `options`. Other cells
/// are untouched.
pub fn render_table(table: &Table, options: &RenderOptions) -> Table {
    if !options.percent_suffix {
        return table.clone();
    }
    let percent: Vec<bool> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| options.is_percent_cell(&table.name, i, c))
        .collect();

    table.map_cells(|column, value| match value {
        Value::Number(n) if percent[column] => Value::Text(format_percent(*n)),
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown() -> Table {
        Table::from_rows(
            "AP Analysis",
            ["PM Type", "Total Amount", "Count", "Percentage of PM Type"],
            vec![vec!["Mechanical".into(), Value::Number(150.0), Value::Number(2.0), Value::Number(12.34)]],
        )
        .unwrap()
    }

    #[test]
    fn percent_text() {
        assert_eq!(format_percent(12.34), "12.34%");
        assert_eq!(format_percent(100.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }

    #[test]
    fn numeric_by_default() {
        let t = render_table(&breakdown(), &RenderOptions::default());
        assert_eq!(t.rows()[0][3], Value::Number(12.34));
    }

    #[test]
    fn renders_percentage_columns_only() {
        let t = render_table(&breakdown(), &RenderOptions::default().with_percent_suffix());
        assert_eq!(t.rows()[0][1], Value::Number(150.0));
        assert_eq!(t.rows()[0][3], Value::text("12.34%"));
    }

    #[test]
    fn percent_tables_render_every_value_column() {
        let ct = Table::from_rows(
            "AP Scope Percentages",
            ["PM Type", "Main Contract Scope", "Unspecified"],
            vec![vec!["Other".into(), Value::Number(0.0), Value::Number(100.0)]],
        )
        .unwrap();
        let opts = RenderOptions::default()
            .with_percent_suffix()
            .with_percent_table("AP Scope Percentages");
        let t = render_table(&ct, &opts);
        assert_eq!(t.rows()[0][0], Value::text("Other"));
        assert_eq!(t.rows()[0][1], Value::text("0.00%"));
        assert_eq!(t.rows()[0][2], Value::text("100.00%"));
    }
}
