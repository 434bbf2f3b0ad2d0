// Table I/O: CSV, Excel and JSON readers/writers for the ledger pipeline

pub mod csv;
pub mod error;
pub mod json;
pub mod render;
mod shape;
pub mod source;
pub mod xlsx;

pub use error::IoError;
pub use render::{format_percent, RenderOptions};
pub use source::{load_input, read_table};
