use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::aggregate::{validate_dimensions, AggregateRequest};
use crate::categorize::CategoryRules;
use crate::crosstab::{ColumnTaxonomy, CrossTabRequest, UNSPECIFIED};
use crate::error::LedgerError;
use crate::merge::MergeOptions;

pub const DEFAULT_CATEGORY_COLUMN: &str = "PM Type";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Column the categorizer writes its label into.
    #[serde(default = "default_category_column")]
    pub category_column: String,
    #[serde(default)]
    pub categories: CategoryRules,
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub combined: Option<CombinedConfig>,
    pub report: ReportConfig,
}

fn default_category_column() -> String {
    DEFAULT_CATEGORY_COLUMN.into()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where a table comes from. Resolved and read by the caller, never here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableRef {
    pub file: String,
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// The accumulated ledger the candidates merge into.
    pub master: TableRef,
    #[serde(default)]
    pub candidates: Vec<TableRef>,
    pub key_column: String,
    pub amount_column: String,
    /// Free-text column the categorizer reads. No categorization without it.
    #[serde(default)]
    pub description_column: Option<String>,
    /// Extra columns that must be present after merging.
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Candidate columns carried into the master; all when omitted.
    #[serde(default)]
    pub merge_columns: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_keys: Vec<String>,
    #[serde(default)]
    pub breakdown: Option<BreakdownConfig>,
    #[serde(default)]
    pub crosstab: Option<CrossTabConfig>,
    pub outputs: SourceOutputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownConfig {
    pub dimensions: Vec<String>,
    /// Category dimension for percentages. Defaults to the pipeline's
    /// category column when this source is categorized.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossTabConfig {
    pub rows: String,
    pub columns: String,
    pub taxonomy: Vec<String>,
    #[serde(default = "default_unspecified")]
    pub unspecified: String,
}

fn default_unspecified() -> String {
    UNSPECIFIED.into()
}

impl CrossTabConfig {
    pub fn taxonomy(&self) -> ColumnTaxonomy {
        ColumnTaxonomy {
            labels: self.taxonomy.clone(),
            unspecified: self.unspecified.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceOutputs {
    pub ledger: String,
    #[serde(default)]
    pub removed: Option<String>,
    #[serde(default)]
    pub breakdown: Option<String>,
    #[serde(default)]
    pub crosstab_amounts: Option<String>,
    #[serde(default)]
    pub crosstab_percent: Option<String>,
}

impl SourceOutputs {
    pub fn removed_name(&self) -> String {
        self.removed.clone().unwrap_or_else(|| crate::exclude::removed_table_name(&self.ledger))
    }

    pub fn breakdown_name(&self) -> String {
        self.breakdown.clone().unwrap_or_else(|| format!("{} Breakdown", self.ledger))
    }

    pub fn crosstab_amounts_name(&self) -> String {
        self.crosstab_amounts.clone().unwrap_or_else(|| format!("{} Amounts", self.ledger))
    }

    pub fn crosstab_percent_name(&self) -> String {
        self.crosstab_percent.clone().unwrap_or_else(|| format!("{} Percentages", self.ledger))
    }
}

impl SourceConfig {
    pub fn categorizes(&self) -> bool {
        self.description_column.is_some()
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            key_column: self.key_column.clone(),
            columns: self.merge_columns.clone(),
        }
    }

    pub fn aggregate_request(&self, category_column: &str) -> Option<AggregateRequest> {
        let b = self.breakdown.as_ref()?;
        let category = b
            .category
            .clone()
            .or_else(|| self.categorizes().then(|| category_column.to_string()));
        Some(AggregateRequest {
            dimensions: b.dimensions.clone(),
            amount_column: self.amount_column.clone(),
            category_column: category,
        })
    }

    pub fn crosstab_request(&self) -> Option<CrossTabRequest> {
        self.crosstab
            .as_ref()
            .map(|c| CrossTabRequest::new(&c.rows, &c.columns, &self.amount_column))
    }

    /// Columns the merged ledger must carry before categorization. The
    /// derived category column is excluded when this source produces it.
    pub fn input_columns(&self, category_column: &str) -> Vec<String> {
        let mut cols: Vec<String> = vec![self.key_column.clone(), self.amount_column.clone()];
        cols.extend(self.description_column.iter().cloned());
        cols.extend(self.required_columns.iter().cloned());
        if let Some(b) = &self.breakdown {
            cols.extend(b.dimensions.iter().cloned());
        }
        if let Some(c) = &self.crosstab {
            cols.push(c.rows.clone());
            cols.push(c.columns.clone());
        }

        let mut seen = HashSet::new();
        cols.retain(|c| seen.insert(c.clone()));
        if self.categorizes() {
            cols.retain(|c| c != category_column);
        }
        cols
    }

    /// Names of every table this source can produce, in production order.
    pub fn output_names(&self) -> Vec<String> {
        let mut names = vec![self.outputs.ledger.clone()];
        if !self.exclude_keys.is_empty() || self.outputs.removed.is_some() {
            names.push(self.outputs.removed_name());
        }
        if self.breakdown.is_some() {
            names.push(self.outputs.breakdown_name());
        }
        if self.crosstab.is_some() {
            names.push(self.outputs.crosstab_amounts_name());
            names.push(self.outputs.crosstab_percent_name());
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Combined + Report
// ---------------------------------------------------------------------------

/// Category summary across sources, with its running-total and base/build
/// variants.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedConfig {
    pub sources: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub running_total: Option<String>,
    #[serde(default)]
    pub base_build: Option<String>,
}

impl CombinedConfig {
    pub fn output_names(&self) -> Vec<String> {
        let mut names = vec![self.summary.clone()];
        names.extend(self.running_total.iter().cloned());
        names.extend(self.base_build.iter().cloned());
        names
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub keep: Vec<String>,
    /// Render percentage columns as `"12.34%"` text when writing.
    #[serde(default)]
    pub percent_suffix: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, LedgerError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| LedgerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.category_column.trim().is_empty() {
            return Err(LedgerError::ConfigValidation("category_column must not be empty".into()));
        }
        self.categories.validate()?;

        if self.sources.is_empty() {
            return Err(LedgerError::ConfigValidation("at least one source is required".into()));
        }

        for (name, source) in &self.sources {
            validate_source(name, source)?;
        }

        if let Some(ref combined) = self.combined {
            if combined.sources.is_empty() {
                return Err(LedgerError::ConfigValidation(
                    "combined: at least one source is required".into(),
                ));
            }
            for s in &combined.sources {
                let source = self.sources.get(s).ok_or_else(|| {
                    LedgerError::ConfigValidation(format!("combined: unknown source '{s}'"))
                })?;
                if !source.categorizes() {
                    return Err(LedgerError::ConfigValidation(format!(
                        "combined: source '{s}' has no description_column to categorize"
                    )));
                }
            }
        }

        let mut produced = HashSet::new();
        for name in self.output_names() {
            if !produced.insert(name.clone()) {
                return Err(LedgerError::ConfigValidation(format!(
                    "output table '{name}' is produced more than once"
                )));
            }
        }

        if self.report.keep.is_empty() {
            return Err(LedgerError::ConfigValidation("report.keep must not be empty".into()));
        }
        let mut kept = HashSet::new();
        for name in &self.report.keep {
            if !kept.insert(name.as_str()) {
                return Err(LedgerError::ConfigValidation(format!(
                    "report.keep lists '{name}' twice"
                )));
            }
        }

        Ok(())
    }

    /// Every table name the pipeline can produce, sources first.
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.values().flat_map(SourceConfig::output_names).collect();
        if let Some(ref combined) = self.combined {
            names.extend(combined.output_names());
        }
        names
    }
}

fn validate_source(name: &str, source: &SourceConfig) -> Result<(), LedgerError> {
    let err = |msg: String| LedgerError::ConfigValidation(format!("source '{name}': {msg}"));

    if source.key_column.trim().is_empty() {
        return Err(err("key_column must not be empty".into()));
    }
    if source.amount_column.trim().is_empty() {
        return Err(err("amount_column must not be empty".into()));
    }
    if source.key_column == source.amount_column {
        return Err(err("key_column and amount_column must differ".into()));
    }
    if source.master.file.trim().is_empty() {
        return Err(err("master.file must not be empty".into()));
    }
    if source.outputs.ledger.trim().is_empty() {
        return Err(err("outputs.ledger must not be empty".into()));
    }

    if let Some(ref b) = source.breakdown {
        validate_dimensions(&b.dimensions, &source.amount_column).map_err(|e| err(e.to_string()))?;
    }
    if let Some(ref c) = source.crosstab {
        CrossTabRequest::new(&c.rows, &c.columns, &source.amount_column)
            .validate()
            .map_err(|e| err(e.to_string()))?;
        c.taxonomy().validate().map_err(|e| err(e.to_string()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
