use std::collections::BTreeMap;

use crate::aggregate::amount_of;
use crate::error::LedgerError;
use crate::merge::MergeOutcome;
use crate::model::{RunSummary, SourceSummary};
use crate::table::Table;

/// Row accounting for one source run.
pub struct SourceCounts<'a> {
    pub master_rows: usize,
    pub candidate_rows: usize,
    pub excluded: usize,
    pub merge: &'a MergeOutcome,
}

/// Summary statistics for one finished ledger.
pub fn summarize_source(
    ledger: &Table,
    amount_column: &str,
    category_column: Option<&str>,
    counts: SourceCounts<'_>,
) -> Result<SourceSummary, LedgerError> {
    let mut unparseable = 0;
    let total_amount = ledger
        .column_values(amount_column)?
        .filter_map(|v| amount_of(v, &mut unparseable))
        .sum();

    let mut category_counts = BTreeMap::new();
    if let Some(col) = category_column {
        for v in ledger.column_values(col)? {
            *category_counts.entry(v.raw_display()).or_insert(0) += 1;
        }
    }

    Ok(SourceSummary {
        ledger: ledger.name.clone(),
        master_rows: counts.master_rows,
        candidate_rows: counts.candidate_rows,
        appended: counts.merge.appended,
        skipped: counts.merge.skipped,
        excluded: counts.excluded,
        rows: ledger.len(),
        total_amount,
        category_counts,
    })
}

/// Roll per-source summaries into the run summary.
pub fn compute_summary(
    sources: BTreeMap<String, SourceSummary>,
    tables_produced: usize,
    combined_total: Option<f64>,
) -> RunSummary {
    RunSummary {
        sources,
        tables_produced,
        combined_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn summary_counts() {
        let ledger = Table::from_rows(
            "pc_overview AP",
            ["PO #", "Amount", "PM Type"],
            vec![
                vec!["1".into(), Value::Number(10.0), "Mechanical".into()],
                vec!["2".into(), "$1,000.50".into(), "Mechanical".into()],
                vec!["3".into(), "n/a".into(), "Other".into()],
            ],
        )
        .unwrap();
        let merge = MergeOutcome {
            table: ledger.clone(),
            appended: 2,
            skipped: 1,
        };
        let s = summarize_source(
            &ledger,
            "Amount",
            Some("PM Type"),
            SourceCounts {
                master_rows: 1,
                candidate_rows: 3,
                excluded: 0,
                merge: &merge,
            },
        )
        .unwrap();

        assert_eq!(s.rows, 3);
        assert_eq!(s.appended, 2);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.total_amount, 1010.5);
        assert_eq!(s.category_counts["Mechanical"], 2);
        assert_eq!(s.category_counts["Other"], 1);
    }

    #[test]
    fn uncategorized_source_has_no_counts() {
        let ledger = Table::from_rows("AR", ["PO #", "Total Contract $"], vec![vec!["1".into(), Value::Number(5.0)]]).unwrap();
        let merge = MergeOutcome {
            table: ledger.clone(),
            appended: 0,
            skipped: 0,
        };
        let s = summarize_source(
            &ledger,
            "Total Contract $",
            None,
            SourceCounts {
                master_rows: 1,
                candidate_rows: 0,
                excluded: 0,
                merge: &merge,
            },
        )
        .unwrap();
        assert!(s.category_counts.is_empty());
        assert_eq!(s.total_amount, 5.0);
    }
}
