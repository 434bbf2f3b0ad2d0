//! `poledger run` and `poledger validate`: config-driven ledger reports.

use std::path::{Path, PathBuf};

use serde::Serialize;

use poledger_recon::report::AssemblyReport;
use poledger_recon::{PipelineConfig, PipelineResult};

use crate::output::{render_options, write_report, OutputFormat};
use crate::CliError;

#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    result: &'a PipelineResult,
    output: String,
    assembled: &'a AssemblyReport,
}

fn load_config(config_path: &Path) -> Result<PipelineConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::input(format!("cannot read config {}: {e}", config_path.display())))?;
    Ok(PipelineConfig::from_toml(&config_str)?)
}

pub fn cmd_run(
    config_path: PathBuf,
    output: PathBuf,
    format: Option<OutputFormat>,
    json_output: bool,
    fresh: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve input paths relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = poledger_io::load_input(&config, base_dir)?;

    let result = poledger_recon::run(&config, &input)?;

    let format = OutputFormat::resolve(&output, format);
    let assembled = write_report(
        &result.tables,
        &config.report.keep,
        &output,
        format,
        render_options(&config),
        fresh,
    )?;

    if json_output {
        let out = RunOutput {
            result: &result,
            output: output.display().to_string(),
            assembled: &assembled,
        };
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    for (name, s) in &result.summary.sources {
        eprintln!(
            "{name}: '{}' {} rows ({} master, {} appended, {} duplicate, {} excluded), total {:.2}",
            s.ledger, s.rows, s.master_rows, s.appended, s.skipped, s.excluded, s.total_amount,
        );
    }
    if let Some(total) = result.summary.combined_total {
        eprintln!("combined: total {total:.2}");
    }
    eprintln!(
        "wrote {} of {} table(s) to {}",
        assembled.written.len(),
        result.summary.tables_produced,
        output.display()
    );

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let produced = config.output_names();

    let unproduced: Vec<&String> = config.report.keep.iter().filter(|k| !produced.contains(k)).collect();
    for name in &unproduced {
        eprintln!("warning: report.keep lists '{name}', which no source produces");
    }

    if json_output {
        let out = serde_json::json!({
            "name": config.name,
            "sources": config.sources.keys().collect::<Vec<_>>(),
            "tables": produced,
            "keep": config.report.keep,
        });
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprintln!(
        "config OK: '{}' with {} source(s), {} table(s), {} kept",
        config.name,
        config.sources.len(),
        produced.len(),
        config.report.keep.len()
    );
    Ok(())
}
