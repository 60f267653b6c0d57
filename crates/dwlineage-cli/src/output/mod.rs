//! Report formatting.

pub mod json;
pub mod table;

pub use json::{format_batch_json, format_outcome_json};
pub use table::format_table;
