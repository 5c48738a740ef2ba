//! Output formatting module
//!
//! Renders failure reports and run summaries.

mod formatter;

pub use formatter::{OutputFormat, ReportFormatter};
