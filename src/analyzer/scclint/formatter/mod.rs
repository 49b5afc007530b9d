//! Output formatters for check and batch reports.

pub mod json;
pub mod plain;

use crate::analyzer::scclint::batch::BatchReport;
use crate::analyzer::scclint::report::Report;
use clap::ValueEnum;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Text,
    /// JSON document.
    Json,
}

/// Format a check report to a string.
pub fn format_report(report: &Report, format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Text => plain::format(report, color),
        OutputFormat::Json => json::format(report),
    }
}

/// Format a batch report to a string.
pub fn format_batch(report: &BatchReport, format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Text => plain::format_batch(report, color),
        OutputFormat::Json => json::format_batch(report),
    }
}
