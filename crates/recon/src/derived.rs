//! Derived tables: summaries layered on top of an aggregation.

use std::collections::BTreeMap;

use crate::aggregate::{aggregate, percentage, AggregateRequest, Aggregation, COUNT, TOTAL_AMOUNT};
use crate::categorize::CategoryRules;
use crate::error::LedgerError;
use crate::table::{Table, Value};

pub const STACKED_AMOUNT: &str = "Amount";
pub const SHARE_OF_TOTAL: &str = "Percentage";
pub const RUNNING_TOTAL: &str = "Running Total";
pub const CUMULATIVE_PERCENTAGE: &str = "Cumulative Percentage";
pub const ROLLUP_CATEGORY: &str = "Category";

/// Stack the category and amount columns of several sources into one
/// two-column table (`category_column`, `Amount`). Every source is checked
/// before any row is copied.
pub fn stack_amounts(
    name: &str,
    sources: &[(&Table, &str)],
    category_column: &str,
) -> Result<Table, LedgerError> {
    let mut indices = Vec::with_capacity(sources.len());
    for (table, amount_column) in sources {
        indices.push((table.column_index(category_column)?, table.column_index(amount_column)?));
    }

    let mut stacked = Table::new(name, [category_column, STACKED_AMOUNT]);
    for ((table, _), (cat_idx, amount_idx)) in sources.iter().zip(indices) {
        for row in table.rows() {
            let amount = row[amount_idx].as_number().map(Value::Number).unwrap_or(Value::Empty);
            stacked.push_row(vec![row[cat_idx].clone(), amount])?;
        }
    }
    Ok(stacked)
}

/// Category totals across several sources, ordered by category.
pub fn category_summary(
    sources: &[(&Table, &str)],
    category_column: &str,
) -> Result<Aggregation, LedgerError> {
    let stacked = stack_amounts("combined", sources, category_column)?;
    aggregate(
        &stacked,
        &AggregateRequest::new([category_column], STACKED_AMOUNT).with_category(category_column),
    )
}

/// The aggregation table plus each row's share of the grand total.
pub fn with_share_of_total(agg: &Aggregation, name: &str) -> Result<Table, LedgerError> {
    let grand = agg.grand_total();
    let mut table = agg.to_table(name)?;
    let shares = agg
        .rows
        .iter()
        .map(|r| Value::Number(percentage(r.total, grand)))
        .collect();
    table.set_column(SHARE_OF_TOTAL, shares)?;
    Ok(table)
}

/// Share-of-total table with a running total and cumulative percentage, in
/// the aggregation's row order.
pub fn running_total(agg: &Aggregation, name: &str) -> Result<Table, LedgerError> {
    let grand = agg.grand_total();
    let mut table = with_share_of_total(agg, name)?;

    let mut running = 0.0;
    let mut totals = Vec::with_capacity(agg.rows.len());
    let mut cumulative = Vec::with_capacity(agg.rows.len());
    for row in &agg.rows {
        running += row.total;
        totals.push(Value::Number(running));
        cumulative.push(Value::Number(percentage(running, grand)));
    }

    table.set_column(RUNNING_TOTAL, totals)?;
    table.set_column(CUMULATIVE_PERCENTAGE, cumulative)?;
    Ok(table)
}

/// Two-way Base/Build rollup of an aggregation grouped on `category_column`.
pub fn base_build_rollup(
    agg: &Aggregation,
    category_column: &str,
    rules: &CategoryRules,
    name: &str,
) -> Result<Table, LedgerError> {
    let pos = agg
        .dimensions
        .iter()
        .position(|d| d == category_column)
        .ok_or_else(|| {
            LedgerError::invalid_dimension(category_column, "aggregation is not grouped on this column")
        })?;

    let mut rollup: BTreeMap<&'static str, (f64, usize)> = BTreeMap::new();
    for row in &agg.rows {
        let label = rules.base_build(row.values[pos].as_str().unwrap_or(""));
        let entry = rollup.entry(label).or_insert((0.0, 0));
        entry.0 += row.total;
        entry.1 += row.count;
    }

    let mut table = Table::new(name, [ROLLUP_CATEGORY, TOTAL_AMOUNT, COUNT]);
    for (label, (total, count)) in rollup {
        table.push_row(vec![Value::text(label), Value::Number(total), count.into()])?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
