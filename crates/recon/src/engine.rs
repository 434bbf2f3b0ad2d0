use std::collections::BTreeMap;

use crate::aggregate::{aggregate, Aggregation};
use crate::config::{PipelineConfig, SourceConfig};
use crate::crosstab::{cross_tabulate, CrossTabulation};
use crate::derived::{base_build_rollup, category_summary, running_total, with_share_of_total};
use crate::error::LedgerError;
use crate::exclude::exclude_keys;
use crate::merge::merge_all;
use crate::model::{PipelineInput, PipelineResult, RunMeta, SourceInput, SourceSummary};
use crate::report::{assemble, AssemblyReport, TableSet, TableSink};
use crate::summary::{compute_summary, summarize_source, SourceCounts};
use crate::table::Table;

/// Run the pipeline per config. Returns every produced table plus the
/// structured breakdowns and a summary. Nothing is emitted here; see
/// [`assemble_report`].
pub fn run(config: &PipelineConfig, input: &PipelineInput) -> Result<PipelineResult, LedgerError> {
    config.validate()?;

    let mut tables = TableSet::new();
    let mut ledgers: BTreeMap<&str, Table> = BTreeMap::new();
    let mut summaries: BTreeMap<String, SourceSummary> = BTreeMap::new();
    let mut breakdowns = BTreeMap::new();
    let mut crosstabs = BTreeMap::new();

    for (name, source) in &config.sources {
        let data = input
            .sources
            .get(name)
            .ok_or_else(|| LedgerError::MissingInput(name.clone()))?;
        let out = run_source(config, source, data)?;

        log::info!(
            "source '{name}': {} row(s) in '{}' ({} appended, {} excluded)",
            out.summary.rows,
            out.ledger.name,
            out.summary.appended,
            out.summary.excluded
        );

        tables.insert(out.ledger.clone());
        if let Some(removed) = out.removed {
            tables.insert(removed);
        }
        if let Some(agg) = out.breakdown {
            tables.insert(agg.to_table(&source.outputs.breakdown_name())?);
            breakdowns.insert(name.clone(), agg);
        }
        if let Some(ct) = out.crosstab {
            tables.insert(ct.amounts.to_table(&source.outputs.crosstab_amounts_name())?);
            tables.insert(ct.percentages.to_table(&source.outputs.crosstab_percent_name())?);
            crosstabs.insert(name.clone(), ct);
        }
        summaries.insert(name.clone(), out.summary);
        ledgers.insert(name.as_str(), out.ledger);
    }

    let combined = match config.combined {
        Some(ref combined) => {
            let mut sources: Vec<(&Table, &str)> = Vec::with_capacity(combined.sources.len());
            for s in &combined.sources {
                let ledger = ledgers
                    .get(s.as_str())
                    .ok_or_else(|| LedgerError::MissingInput(s.clone()))?;
                sources.push((ledger, config.sources[s].amount_column.as_str()));
            }
            let agg = category_summary(&sources, &config.category_column)?;

            tables.insert(with_share_of_total(&agg, &combined.summary)?);
            if let Some(ref name) = combined.running_total {
                tables.insert(running_total(&agg, name)?);
            }
            if let Some(ref name) = combined.base_build {
                tables.insert(base_build_rollup(&agg, &config.category_column, &config.categories, name)?);
            }
            Some(agg)
        }
        None => None,
    };

    let summary = compute_summary(summaries, tables.len(), combined.as_ref().map(Aggregation::grand_total));

    Ok(PipelineResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        breakdowns,
        crosstabs,
        combined,
        tables,
    })
}

/// Emit the configured keep-list from `result` into `sink`.
pub fn assemble_report(
    config: &PipelineConfig,
    result: &PipelineResult,
    sink: &mut dyn TableSink,
) -> Result<AssemblyReport, LedgerError> {
    assemble(&result.tables, &config.report.keep, sink)
}

struct SourceRun {
    ledger: Table,
    removed: Option<Table>,
    breakdown: Option<Aggregation>,
    crosstab: Option<CrossTabulation>,
    summary: SourceSummary,
}

fn run_source(config: &PipelineConfig, source: &SourceConfig, data: &SourceInput) -> Result<SourceRun, LedgerError> {
    let options = source.merge_options();

    // Exclusion runs on every input so an excluded key can't be merged back in.
    let master = exclude_keys(&data.master, &source.key_column, &source.exclude_keys)?;
    let mut kept = Vec::with_capacity(data.candidates.len());
    let mut removed = Vec::with_capacity(data.candidates.len());
    for cand in &data.candidates {
        let split = exclude_keys(cand, &source.key_column, &source.exclude_keys)?;
        kept.push(split.kept);
        removed.push(split.removed);
    }
    let excluded = master.removed.len() + removed.iter().map(Table::len).sum::<usize>();

    let merged = merge_all(&master.kept, &kept, &options)?;
    let mut ledger = merged.table.clone().renamed(source.outputs.ledger.clone());
    ledger.require_columns(&source.input_columns(&config.category_column))?;

    let removed = if source.output_names().contains(&source.outputs.removed_name()) {
        let table = merge_all(&master.removed, &removed, &options)?.table;
        Some(table.renamed(source.outputs.removed_name()))
    } else {
        None
    };

    if let Some(ref desc) = source.description_column {
        ledger = config.categories.categorize_table(ledger, desc, &config.category_column)?;
    }

    let breakdown = source
        .aggregate_request(&config.category_column)
        .map(|req| aggregate(&ledger, &req))
        .transpose()?;

    let crosstab = source
        .crosstab
        .as_ref()
        .zip(source.crosstab_request())
        .map(|(ct, req)| cross_tabulate(&ledger, &req, &ct.taxonomy()))
        .transpose()?;

    let summary = summarize_source(
        &ledger,
        &source.amount_column,
        source.categorizes().then_some(config.category_column.as_str()),
        SourceCounts {
            master_rows: data.master.len(),
            candidate_rows: data.candidates.iter().map(Table::len).sum(),
            excluded,
            merge: &merged,
        },
    )?;

    Ok(SourceRun {
        ledger,
        removed,
        breakdown,
        crosstab,
        summary,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
