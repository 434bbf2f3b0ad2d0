//! `poledger merge` and `poledger breakdown`: one-off operations on files,
//! without a config.

use std::path::PathBuf;

use clap::Args;

use poledger_io::{read_table, RenderOptions};
use poledger_recon::aggregate::{aggregate, AggregateRequest};
use poledger_recon::categorize::{CategoryRule, CategoryRules};
use poledger_recon::config::DEFAULT_CATEGORY_COLUMN;
use poledger_recon::crosstab::{cross_tabulate, ColumnTaxonomy, CrossTabRequest};
use poledger_recon::exclude::exclude_keys;
use poledger_recon::merge::{merge_all, MergeOptions};
use poledger_recon::{Table, TableSet};

use crate::output::{write_report, write_table_file, OutputFormat};
use crate::CliError;

// ============================================================================
// merge
// ============================================================================

pub fn cmd_merge(
    master: PathBuf,
    candidates: Vec<PathBuf>,
    key: String,
    columns: Vec<String>,
    exclude: Vec<String>,
    output: PathBuf,
) -> Result<(), CliError> {
    let master_table = read_table(&master, None)?;
    let candidate_tables = candidates
        .iter()
        .map(|p| read_table(p, None))
        .collect::<Result<Vec<_>, _>>()?;

    let mut options = MergeOptions::new(&key);
    if !columns.is_empty() {
        options = options.with_columns(columns);
    }

    let master_kept = exclude_keys(&master_table, &key, &exclude)?.kept;
    let mut kept = Vec::with_capacity(candidate_tables.len());
    for cand in &candidate_tables {
        kept.push(exclude_keys(cand, &key, &exclude)?.kept);
    }
    let excluded = master_table.len() - master_kept.len()
        + candidate_tables.iter().map(Table::len).sum::<usize>()
        - kept.iter().map(Table::len).sum::<usize>();

    let outcome = merge_all(&master_kept, &kept, &options)?;
    write_table_file(&outcome.table, &output, RenderOptions::default())?;

    eprintln!(
        "merged: {} master row(s) + {} appended, {} duplicate(s) skipped, {} excluded -> {}",
        master_kept.len(),
        outcome.appended,
        outcome.skipped,
        excluded,
        output.display()
    );
    Ok(())
}

// ============================================================================
// breakdown
// ============================================================================

#[derive(Args)]
pub struct BreakdownArgs {
    /// Ledger file (.csv, .tsv, .xlsx, ...)
    pub file: PathBuf,

    /// Sheet to read from a workbook (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Amount column to sum
    #[arg(long, short = 'a')]
    pub amount: String,

    /// Grouping dimensions, in order (comma-separated)
    #[arg(long, short = 'd', value_delimiter = ',', required = true)]
    pub dims: Vec<String>,

    /// Category dimension that percentages are computed within
    #[arg(long)]
    pub category: Option<String>,

    /// Derive the category column from this description column first
    #[arg(long, value_name = "COLUMN")]
    pub describe: Option<String>,

    /// Categorization rule KEYWORD=LABEL, first match wins. Repeatable.
    #[arg(long, value_name = "KEYWORD=LABEL", requires = "describe")]
    pub rule: Vec<String>,

    /// Label for descriptions no rule matches
    #[arg(long, default_value = "Other")]
    pub default_label: String,

    /// Name of the derived category column
    #[arg(long, default_value = DEFAULT_CATEGORY_COLUMN)]
    pub category_column: String,

    /// Cross-tab row dimension
    #[arg(long, requires_all = ["columns", "taxonomy"])]
    pub rows: Option<String>,

    /// Cross-tab column dimension
    #[arg(long, requires_all = ["rows", "taxonomy"])]
    pub columns: Option<String>,

    /// Cross-tab column labels, in order (comma-separated). `Unspecified` is
    /// appended when absent.
    #[arg(long, value_delimiter = ',', requires_all = ["rows", "columns"])]
    pub taxonomy: Vec<String>,

    /// Output file or directory (omit to print the breakdown as JSON)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Output format (inferred from the output path if omitted)
    #[arg(long, short = 'f')]
    pub format: Option<OutputFormat>,

    /// Render percentages as "12.34%" text
    #[arg(long)]
    pub percent_suffix: bool,
}

fn parse_rule(arg: &str) -> Result<CategoryRule, CliError> {
    match arg.split_once('=') {
        Some((keyword, label)) if !keyword.trim().is_empty() && !label.trim().is_empty() => {
            Ok(CategoryRule::new(keyword.trim(), label.trim()))
        }
        _ => Err(CliError::args(format!("invalid --rule '{arg}'")).with_hint("expected KEYWORD=LABEL")),
    }
}

pub fn cmd_breakdown(args: BreakdownArgs) -> Result<(), CliError> {
    let mut table = read_table(&args.file, args.sheet.as_deref())?;
    let stem = table.name.clone();

    if let Some(ref desc) = args.describe {
        let rules = args.rule.iter().map(|r| parse_rule(r)).collect::<Result<Vec<_>, _>>()?;
        let rules = CategoryRules::new(rules, args.default_label.clone());
        rules.validate()?;
        table = rules.categorize_table(table, desc, &args.category_column)?;
    }

    let mut request = AggregateRequest::new(args.dims.clone(), args.amount.clone());
    if let Some(ref c) = args.category {
        request = request.with_category(c.clone());
    }
    let agg = aggregate(&table, &request)?;

    let crosstab = match (&args.rows, &args.columns) {
        (Some(rows), Some(columns)) => {
            let req = CrossTabRequest::new(rows, columns, &args.amount);
            Some(cross_tabulate(&table, &req, &ColumnTaxonomy::new(args.taxonomy.clone()))?)
        }
        _ => None,
    };

    let Some(output) = args.output else {
        let out = serde_json::json!({ "breakdown": agg, "crosstab": crosstab });
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    };

    let breakdown_name = format!("{stem} Breakdown");
    let amounts_name = format!("{stem} Amounts");
    let percent_name = format!("{stem} Percentages");

    let mut produced = TableSet::new();
    produced.insert(agg.to_table(&breakdown_name)?);
    let mut render = RenderOptions::default();
    if args.percent_suffix {
        render = render.with_percent_suffix();
    }
    if let Some(ref ct) = crosstab {
        produced.insert(ct.amounts.to_table(&amounts_name)?);
        produced.insert(ct.percentages.to_table(&percent_name)?);
        render = render.with_percent_table(percent_name.clone());
    }

    let keep: Vec<String> = produced.names().map(String::from).collect();
    let format = OutputFormat::resolve(&output, args.format);
    write_report(&produced, &keep, &output, format, render, true)?;

    eprintln!(
        "{} group(s), {} record(s), total {:.2} -> {}",
        agg.rows.len(),
        agg.record_count(),
        agg.grand_total(),
        output.display()
    );
    Ok(())
}
