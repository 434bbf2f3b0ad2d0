use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::crosstab::CrossTabulation;
use crate::report::TableSet;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded tables for one source: the accumulated master ledger and the
/// fresh exports to merge into it.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub master: Table,
    pub candidates: Vec<Table>,
}

impl SourceInput {
    pub fn new(master: Table) -> Self {
        Self {
            master,
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, candidate: Table) -> Self {
        self.candidates.push(candidate);
        self
    }
}

/// Pre-loaded tables grouped by source name.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub sources: HashMap<String, SourceInput>,
}

impl PipelineInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: impl Into<String>, input: SourceInput) -> Self {
        self.sources.insert(name.into(), input);
        self
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub ledger: String,
    pub master_rows: usize,
    pub candidate_rows: usize,
    pub appended: usize,
    pub skipped: usize,
    pub excluded: usize,
    pub rows: usize,
    pub total_amount: f64,
    /// Rows per category label; empty for uncategorized sources.
    pub category_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub sources: BTreeMap<String, SourceSummary>,
    pub tables_produced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    /// Structured breakdowns keyed by source name.
    pub breakdowns: BTreeMap<String, Aggregation>,
    pub crosstabs: BTreeMap<String, CrossTabulation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<Aggregation>,
    /// Every table produced, in production order. Assembly picks from these.
    #[serde(skip)]
    pub tables: TableSet,
}
