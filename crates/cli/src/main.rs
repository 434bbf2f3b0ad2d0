// poledger CLI - purchase-order ledger reconciliation and breakdown reports

mod adhoc;
mod exit_codes;
mod output;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{io_exit_code, ledger_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};
use output::OutputFormat;
use poledger_io::IoError;
use poledger_recon::LedgerError;

#[derive(Parser)]
#[command(name = "poledger")]
#[command(about = "Merge, categorize and break down AP/AR purchase-order ledgers")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from a ledger config and write the report
    #[command(after_help = "\
Input file paths in the config are resolved relative to the config file.
The output format follows the extension: .xlsx writes one workbook, .json one
JSON document, anything else is treated as a directory of CSV files.

Examples:
  poledger run micu.ledger.toml -o \"MICU AR-AP Breakdown.xlsx\"
  poledger run micu.ledger.toml -o out/ --format csv
  poledger run micu.ledger.toml -o report.json --json
  poledger run micu.ledger.toml -o report.xlsx --fresh")]
    Run {
        /// Path to the .ledger.toml config file
        config: PathBuf,

        /// Report destination (workbook, JSON file, or CSV directory)
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Output format (inferred from the output path if omitted)
        #[arg(long, short = 'f')]
        format: Option<OutputFormat>,

        /// Also print the run result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Start a new workbook instead of rebuilding an existing one in place
        #[arg(long)]
        fresh: bool,
    },

    /// Validate a ledger config without reading any input
    #[command(after_help = "\
Examples:
  poledger validate micu.ledger.toml
  poledger validate micu.ledger.toml --json")]
    Validate {
        /// Path to the .ledger.toml config file
        config: PathBuf,

        /// Print the tables the config would produce as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge candidate ledgers into a master ledger by key
    #[command(after_help = "\
Master rows are kept as they are. Candidate rows whose key is new are appended
in order; rows with a key already present are skipped.

Examples:
  poledger merge Stack.csv pc_overview.xlsx --key \"PO #\" -o merged.csv
  poledger merge Stack.csv a.csv b.csv --key \"PO #\" --columns \"PO #,Amount\" -o merged.xlsx
  poledger merge Stack.csv pc_overview.csv --key \"PO #\" --exclude 4410 -o merged.json")]
    Merge {
        /// Master ledger
        master: PathBuf,

        /// Candidate ledgers, merged in the order given
        #[arg(required = true)]
        candidates: Vec<PathBuf>,

        /// Business key column
        #[arg(long, short = 'k')]
        key: String,

        /// Only carry these columns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Drop rows with these keys before merging (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Output file (.csv, .tsv, .xlsx, .json)
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Group one ledger by dimensions, optionally with a cross-tab
    #[command(after_help = "\
Percentages of the category are reported when --category is one of several
dimensions. A cross-tab needs --rows, --columns and --taxonomy together.

Examples:
  poledger breakdown pc_overview.csv --amount Amount --dims \"PM Type,Main/CO/DCR\" --category \"PM Type\"
  poledger breakdown ledger.xlsx --sheet \"pc_overview AP\" --amount Amount --dims Vendor --json
  poledger breakdown ledger.csv --amount Amount --describe \"PO Description\" \\
      --rule mechanical=Mechanical --rule electrical=Electrical --dims \"PM Type\" -o out.xlsx
  poledger breakdown ledger.csv --amount Amount --dims \"PM Type\" \\
      --rows \"PM Type\" --columns \"Main/CO/DCR\" --taxonomy \"Main Contract Scope,DCR Scope\" -o out/")]
    Breakdown(adhoc::BreakdownArgs),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  poledger-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, output, format, json, fresh } => {
            pipeline::cmd_run(config, output, format, json, fresh)
        }
        Commands::Validate { config, json } => pipeline::cmd_validate(config, json),
        Commands::Merge { master, candidates, key, columns, exclude, output } => {
            adhoc::cmd_merge(master, candidates, key, columns, exclude, output)
        }
        Commands::Breakdown(args) => adhoc::cmd_breakdown(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Pipeline error with its registry exit code and a hint where one helps.
    pub fn ledger(err: LedgerError) -> Self {
        let hint = match &err {
            LedgerError::MissingColumn { column, .. } => Some(format!(
                "check the header row of the input files; '{column}' must match exactly"
            )),
            LedgerError::Assembly { .. } => {
                Some("every report.keep entry must be a table the config produces".to_string())
            }
            LedgerError::ConfigParse(_) => Some("run `poledger validate <config>` for details".to_string()),
            _ => None,
        };
        Self { code: ledger_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn io(err: IoError) -> Self {
        let hint = match &err {
            IoError::SheetNotFound { available, .. } if !available.is_empty() => {
                Some(format!("available sheets: {}", available.join(", ")))
            }
            IoError::UnsupportedFormat(_) => {
                Some("supported inputs: .csv .tsv .txt .xlsx .xlsm .xls .xlsb .ods".to_string())
            }
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LedgerError> for CliError {
    fn from(err: LedgerError) -> Self {
        Self::ledger(err)
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self::io(err)
    }
}
