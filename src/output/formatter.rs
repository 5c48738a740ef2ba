//! Output formatters for failure reports
//!
//! Provides text, JSON and CSV renderings of a finished run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::aggregate::RunSummary;
use crate::models::{Assertion, FailureReport};
use crate::partition::Partition;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Report formatter
pub struct ReportFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Write all reports followed by the summary, returning the report count
    ///
    /// Text output is written report by report as the iterator yields them.
    pub fn write_reports<W, I>(&self, out: &mut W, reports: I, summary: &RunSummary) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = FailureReport>,
    {
        match self.format {
            OutputFormat::Text => self.write_text(out, reports, summary),
            OutputFormat::Json | OutputFormat::JsonPretty => self.write_json(out, reports, summary),
            OutputFormat::Csv => write_csv(out, reports),
        }
    }

    fn write_text<W, I>(&self, out: &mut W, reports: I, summary: &RunSummary) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = FailureReport>,
    {
        let mut count = 0;
        for report in reports {
            out.write_all(self.format_report(&report).as_bytes())?;
            count += 1;
        }
        out.write_all(self.format_summary(summary).as_bytes())?;
        Ok(count)
    }

    fn write_json<W, I>(&self, out: &mut W, reports: I, summary: &RunSummary) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = FailureReport>,
    {
        #[derive(Serialize)]
        struct ReportJson<'a> {
            failures: Vec<ReportEntry>,
            summary: &'a RunSummary,
        }

        #[derive(Serialize)]
        struct ReportEntry {
            path: String,
            segments: Vec<String>,
            request_name: String,
            failures: Vec<Assertion>,
        }

        let failures: Vec<_> = reports
            .into_iter()
            .map(|report| ReportEntry {
                path: report.path_string(),
                segments: report.path,
                request_name: report.request_name,
                failures: report.failures,
            })
            .collect();
        let count = failures.len();
        let json = ReportJson { failures, summary };

        if self.format == OutputFormat::JsonPretty {
            serde_json::to_writer_pretty(&mut *out, &json).context("Failed to write JSON")?;
        } else {
            serde_json::to_writer(&mut *out, &json).context("Failed to write JSON")?;
        }
        writeln!(out)?;
        Ok(count)
    }

    /// Path line followed by one line per failed assertion
    pub fn format_report(&self, report: &FailureReport) -> String {
        let mut output = String::new();

        if self.colorize {
            output.push_str(&format!("\x1b[1m{}\x1b[0m\n", report.path_string()));
        } else {
            output.push_str(&report.path_string());
            output.push('\n');
        }

        for failure in &report.failures {
            if self.colorize {
                output.push_str(&format!("  \x1b[31m✗\x1b[0m {failure}\n"));
            } else {
                output.push_str(&format!("  ✗ {failure}\n"));
            }
        }

        output
    }

    fn format_summary(&self, summary: &RunSummary) -> String {
        let failed = if self.colorize && summary.failed_assertions > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed_assertions)
        } else {
            summary.failed_assertions.to_string()
        };

        let mut output = format!(
            "\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\
             Partitions: {} | Requests: {} | Failed requests: {}\n\
             Assertions: {} | Failed: {} | Duration: {}ms\n",
            summary.partitions,
            summary.requests,
            summary.failed_requests,
            summary.assertions,
            failed,
            summary.duration_ms
        );
        if summary.unresolved_requests > 0 {
            output.push_str(&format!(
                "Unresolved failing requests (not reported): {}\n",
                summary.unresolved_requests
            ));
        }
        output
    }

    /// Partition listing for the `list` command
    pub fn format_partitions(&self, partitions: &[Partition]) -> Result<String> {
        #[derive(Serialize)]
        struct PartitionRow<'a> {
            index: usize,
            name: &'a str,
            requests: usize,
        }

        let rows = partitions.iter().map(|p| PartitionRow {
            index: p.original_index,
            name: p.name(),
            requests: p.request_count(),
        });

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string(&rows.collect::<Vec<_>>())?;
                Ok(format!("{json}\n"))
            }
            OutputFormat::JsonPretty => {
                let json = serde_json::to_string_pretty(&rows.collect::<Vec<_>>())?;
                Ok(format!("{json}\n"))
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                for row in rows {
                    writer.serialize(row)?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|e| anyhow::anyhow!("Failed to write CSV: {}", e.error()))?;
                Ok(String::from_utf8(bytes)?)
            }
            OutputFormat::Text => {
                let mut output = format!("{} partitions\n", partitions.len());
                for row in rows {
                    output.push_str(&format!(
                        "  {:3}. {:40} {:4} requests\n",
                        row.index, row.name, row.requests
                    ));
                }
                Ok(output)
            }
        }
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}

/// One row per failed assertion
fn write_csv<W, I>(out: &mut W, reports: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = FailureReport>,
{
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["path", "request", "assertion", "error", "message"])?;

    let mut count = 0;
    for report in reports {
        let path = report.path_string();
        for failure in &report.failures {
            let (error, message) = failure
                .error
                .as_ref()
                .map(|e| (e.name.as_str(), e.message.as_str()))
                .unwrap_or(("", ""));
            writer.write_record([
                path.as_str(),
                report.request_name.as_str(),
                failure.name.as_str(),
                error,
                message,
            ])?;
        }
        count += 1;
    }

    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Collection, Item};
    use chrono::Utc;

    fn report() -> FailureReport {
        FailureReport {
            path: vec!["API Users".into(), "GetUser".into()],
            request_name: "GetUser".into(),
            failures: vec![Assertion::fail("status is 200", "expected 200 but got 404")],
        }
    }

    fn summary() -> RunSummary {
        RunSummary::new(&[], Utc::now())
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TEXT"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_text_output() {
        let formatter = ReportFormatter::new(OutputFormat::Text).no_color();
        let mut out = Vec::new();
        let count = formatter
            .write_reports(&mut out, vec![report()], &summary())
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(count, 1);
        assert!(text.starts_with("API Users / GetUser\n  ✗ status is 200: expected 200 but got 404\n"));
        assert!(text.contains("Partitions: 0"));
    }

    #[test]
    fn test_json_output() {
        let formatter = ReportFormatter::new(OutputFormat::Json);
        let mut out = Vec::new();
        formatter
            .write_reports(&mut out, vec![report()], &summary())
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["failures"][0]["path"], "API Users / GetUser");
        assert_eq!(value["failures"][0]["request_name"], "GetUser");
        assert_eq!(value["failures"][0]["failures"][0]["name"], "status is 200");
        assert_eq!(value["summary"]["partitions"], 0);
    }

    #[test]
    fn test_csv_output() {
        let formatter = ReportFormatter::new(OutputFormat::Csv);
        let mut out = Vec::new();
        formatter
            .write_reports(&mut out, vec![report()], &summary())
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "path,request,assertion,error,message");
        assert_eq!(
            lines[1],
            "API Users / GetUser,GetUser,status is 200,AssertionError,expected 200 but got 404"
        );
    }

    #[test]
    fn test_format_partitions() {
        let mut collection = Collection::new(
            "API",
            vec![Item::folder("Users", vec![Item::request("GetUser", "http://x")])],
        );
        let partitions = crate::partition::partition(&mut collection).unwrap();

        let text = ReportFormatter::default()
            .format_partitions(&partitions)
            .unwrap();
        assert!(text.contains("API Users"));

        let json = ReportFormatter::new(OutputFormat::Json)
            .format_partitions(&partitions)
            .unwrap();
        assert!(json.contains("\"requests\":1"));

        let csv = ReportFormatter::new(OutputFormat::Csv)
            .format_partitions(&partitions)
            .unwrap();
        assert_eq!(csv, "index,name,requests\n0,API Users,1\n");
    }
}
