//! CLI Exit Code Registry
//!
//! Single source of truth for `poledger` exit codes. Scripts that drive the
//! monthly close rely on them, so codes are never renumbered.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unknown format)          |
//! | 3    | Config error (unparseable or invalid config)         |
//! | 4    | Input error (unreadable file, sheet, or source)      |
//! | 5    | Schema error (a required column is missing)          |
//! | 6    | Invalid dimension (breakdown/cross-tab request)      |
//! | 7    | Assembly error (keep-list table never produced)      |
//! | 8    | Output error (report could not be written)           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`ledger_exit_code`] or [`io_exit_code`]

use poledger_io::IoError;
use poledger_recon::LedgerError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown output format.
pub const EXIT_USAGE: u8 = 2;

/// Config file could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 3;

/// An input file, sheet, or configured source could not be read.
pub const EXIT_INPUT: u8 = 4;

/// A table lacks a column the run requires.
pub const EXIT_SCHEMA: u8 = 5;

/// A breakdown or cross-tab dimension cannot be computed.
pub const EXIT_INVALID_DIMENSION: u8 = 6;

/// The keep-list names a table the run never produced.
pub const EXIT_ASSEMBLY: u8 = 7;

/// The report or an output file could not be written.
pub const EXIT_OUTPUT: u8 = 8;

/// Map a pipeline error to its exit code.
pub fn ledger_exit_code(err: &LedgerError) -> u8 {
    match err.kind() {
        "config" => EXIT_CONFIG,
        "input" => EXIT_INPUT,
        "schema" => EXIT_SCHEMA,
        "invalid_dimension" => EXIT_INVALID_DIMENSION,
        "assembly" => EXIT_ASSEMBLY,
        "sink" => EXIT_OUTPUT,
        _ => EXIT_ERROR,
    }
}

/// Map an I/O error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. }
        | IoError::Parse { .. }
        | IoError::SheetNotFound { .. }
        | IoError::UnsupportedFormat(_) => EXIT_INPUT,
        IoError::Write { .. } => EXIT_OUTPUT,
        IoError::Table(inner) => ledger_exit_code(inner),
    }
}
