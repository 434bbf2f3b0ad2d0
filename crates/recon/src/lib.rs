//! `poledger-recon`: purchase-order ledger reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns merged ledgers,
//! breakdowns and cross-tabulations. No CLI or file IO dependencies.

pub mod aggregate;
pub mod categorize;
pub mod config;
pub mod crosstab;
pub mod derived;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod merge;
pub mod model;
pub mod report;
pub mod summary;
pub mod table;

pub use config::PipelineConfig;
pub use engine::{assemble_report, run};
pub use error::LedgerError;
pub use model::{PipelineInput, PipelineResult, SourceInput};
pub use report::{TableSet, TableSink};
pub use table::{Table, Value};
