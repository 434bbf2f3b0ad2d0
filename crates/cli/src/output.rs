//! Output format selection and report writing.

use std::path::Path;

use clap::ValueEnum;

use poledger_io::csv::CsvDirSink;
use poledger_io::json::JsonSink;
use poledger_io::xlsx::XlsxSink;
use poledger_io::RenderOptions;
use poledger_recon::report::{assemble, AssemblyReport};
use poledger_recon::{PipelineConfig, Table, TableSet};

use crate::CliError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One workbook, one sheet per table
    Xlsx,
    /// One CSV file per table in a directory
    Csv,
    /// One JSON document holding every table
    Json,
}

impl OutputFormat {
    /// Explicit format, else the path's extension. Paths without a known
    /// extension are CSV directories.
    pub fn resolve(path: &Path, explicit: Option<OutputFormat>) -> OutputFormat {
        if let Some(f) = explicit {
            return f;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => OutputFormat::Xlsx,
            "json" => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Render settings for a configured run: percent text when the config asks
/// for it, cross-tab percentage tables rendered across every value column.
pub fn render_options(config: &PipelineConfig) -> RenderOptions {
    let mut opts = RenderOptions::default();
    if config.report.percent_suffix {
        opts = opts.with_percent_suffix();
    }
    for source in config.sources.values() {
        if source.crosstab.is_some() {
            opts = opts.with_percent_table(source.outputs.crosstab_percent_name());
        }
    }
    opts
}

/// Assemble `keep` out of `produced` into the destination and persist it.
pub fn write_report<S: AsRef<str>>(
    produced: &TableSet,
    keep: &[S],
    path: &Path,
    format: OutputFormat,
    render: RenderOptions,
    fresh: bool,
) -> Result<AssemblyReport, CliError> {
    let report = match format {
        OutputFormat::Xlsx => {
            let mut sink = if fresh {
                XlsxSink::new(path, render)
            } else {
                XlsxSink::open(path, render)?
            };
            let report = assemble(produced, keep, &mut sink)?;
            sink.save()?;
            report
        }
        OutputFormat::Json => {
            let mut sink = JsonSink::new(path, render);
            let report = assemble(produced, keep, &mut sink)?;
            sink.save()?;
            report
        }
        OutputFormat::Csv => {
            let mut sink = CsvDirSink::new(path, render)?;
            assemble(produced, keep, &mut sink)?
        }
    };
    Ok(report)
}

/// Write a single table to a file chosen by extension.
pub fn write_table_file(table: &Table, path: &Path, render: RenderOptions) -> Result<(), CliError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => poledger_io::csv::export(&poledger_io::render::render_table(table, &render), path)?,
        "tsv" => poledger_io::csv::export_tsv(&poledger_io::render::render_table(table, &render), path)?,
        "json" => {
            let rendered = poledger_io::render::render_table(table, &render);
            poledger_io::json::export(std::slice::from_ref(&rendered), path)?
        }
        "xlsx" => {
            let produced: TableSet = std::iter::once(table.clone()).collect();
            write_report(&produced, &[table.name.as_str()], path, OutputFormat::Xlsx, render, true)?;
        }
        _ => {
            return Err(CliError::args(format!("unsupported output file '{}'", path.display()))
                .with_hint("use a .csv, .tsv, .xlsx or .json file name"))
        }
    }
    Ok(())
}
