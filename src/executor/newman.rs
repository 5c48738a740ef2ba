//! External engine runner
//!
//! Hands a partition to a newman-compatible command line engine and reads
//! back its JSON reporter export.

use serde::Deserialize;
use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::runner::{ReporterFormat, RunError, Runner};
use crate::models::{Assertion, AssertionError, Collection, Execution, ExecutionResult};
use crate::partition::Partition;

/// Runner that shells out to `newman run`
#[derive(Clone, Debug)]
pub struct NewmanRunner {
    command: String,
    insecure: bool,
}

impl NewmanRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            insecure: false,
        }
    }

    /// Pass `--insecure` so the engine skips certificate checks
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    fn command_args(&self, input: &Path, export: &Path, format: ReporterFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "run".into(),
            input.into(),
            "--reporters".into(),
            format.reporter_name().into(),
            "--reporter-json-export".into(),
            export.into(),
        ];
        if self.insecure {
            args.push("--insecure".into());
        }
        args
    }

    async fn run_partition(
        &self,
        partition: &Partition,
        format: ReporterFormat,
    ) -> Result<ExecutionResult, RunError> {
        let name = partition.name().to_string();
        let io_error = |source| RunError::Io {
            partition: name.clone(),
            source,
        };

        let dir = tempfile::tempdir().map_err(io_error)?;
        let input = dir.path().join("collection.json");
        let export = dir.path().join("report.json");

        let document = serde_json::to_vec(&partition.collection).map_err(|e| RunError::Engine {
            partition: name.clone(),
            message: format!("could not serialize partition: {e}"),
        })?;
        tokio::fs::write(&input, document).await.map_err(io_error)?;

        let args = self.command_args(&input, &export, format);
        debug!("{} {:?}", self.command, args);

        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RunError::Spawn {
                partition: name.clone(),
                source,
            })?;

        // Failed assertions make the engine exit nonzero, so only a missing
        // report counts as a failed run.
        let report = match tokio::fs::read_to_string(&export).await {
            Ok(report) => report,
            Err(_) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(RunError::Engine {
                    partition: name,
                    message: format!("{} ({})", stderr.trim(), output.status),
                });
            }
        };

        if !output.status.success() {
            warn!("{} exited with {} for '{}'", self.command, output.status, name);
        }

        parse_report(&report, &name)
    }
}

impl Runner for NewmanRunner {
    fn run(
        &self,
        partition: &Partition,
        format: ReporterFormat,
    ) -> impl Future<Output = Result<ExecutionResult, RunError>> + Send {
        self.run_partition(partition, format)
    }
}

#[derive(Deserialize)]
struct Report {
    collection: Collection,
    run: ReportRun,
}

#[derive(Deserialize)]
struct ReportRun {
    #[serde(default)]
    executions: Vec<ReportExecution>,
}

#[derive(Deserialize)]
struct ReportExecution {
    #[serde(default)]
    id: Option<String>,
    item: ReportItem,
    #[serde(default)]
    assertions: Vec<ReportAssertion>,
}

#[derive(Deserialize)]
struct ReportItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ReportAssertion {
    assertion: String,
    #[serde(default)]
    error: Option<ReportAssertionError>,
}

#[derive(Deserialize)]
struct ReportAssertionError {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

/// Convert a JSON reporter export into an [`ExecutionResult`]
pub fn parse_report(report: &str, partition: &str) -> Result<ExecutionResult, RunError> {
    let report: Report = serde_json::from_str(report).map_err(|e| RunError::Report {
        partition: partition.to_string(),
        message: e.to_string(),
    })?;

    let executions = report
        .run
        .executions
        .into_iter()
        .map(|execution| Execution {
            item_id: execution.id.or(execution.item.id).unwrap_or_default(),
            item_name: execution.item.name,
            assertions: execution
                .assertions
                .into_iter()
                .map(|a| Assertion {
                    name: a.assertion,
                    error: a.error.map(|e| AssertionError {
                        name: e.name,
                        message: e.message,
                    }),
                })
                .collect(),
        })
        .collect();

    Ok(ExecutionResult {
        result_tree: report.collection,
        executions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Collection, Item};
    use crate::resolver::PathIndex;

    const REPORT: &str = r#"{
        "collection": {
            "info": { "_postman_id": "p1", "name": "API Users", "originalIndex": 0 },
            "item": [
                {
                    "id": "f-admin",
                    "name": "Admin",
                    "item": [
                        {
                            "id": "r-get",
                            "name": "GetUser",
                            "request": { "url": { "path": ["users"], "host": ["localhost"] }, "method": "GET" },
                            "response": [],
                            "event": []
                        }
                    ],
                    "event": []
                }
            ]
        },
        "run": {
            "stats": { "requests": { "total": 1 } },
            "executions": [
                {
                    "cursor": { "ref": "c1" },
                    "item": { "id": "r-get", "name": "GetUser" },
                    "id": "r-get",
                    "assertions": [
                        { "assertion": "has body", "skipped": false },
                        {
                            "assertion": "status is 200",
                            "skipped": false,
                            "error": {
                                "name": "AssertionError",
                                "index": 0,
                                "message": "expected response to have status code 200 but got 404",
                                "stack": "..."
                            }
                        }
                    ]
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_report() {
        let result = parse_report(REPORT, "API Users").unwrap();

        assert_eq!(result.result_tree.name(), "API Users");
        assert_eq!(result.executions.len(), 1);

        let execution = &result.executions[0];
        assert_eq!(execution.item_id, "r-get");
        assert_eq!(execution.item_name, "GetUser");
        assert_eq!(execution.failures().count(), 1);

        let index = PathIndex::build(&result.result_tree);
        assert_eq!(
            index.lookup("r-get"),
            Some(&["API Users".to_string(), "Admin".to_string()][..])
        );
    }

    #[test]
    fn test_parse_report_item_id_fallback() {
        let report = r#"{
            "collection": { "info": { "name": "P" }, "item": [] },
            "run": { "executions": [ { "item": { "id": "x", "name": "R" } } ] }
        }"#;
        let result = parse_report(report, "P").unwrap();
        assert_eq!(result.executions[0].item_id, "x");
        assert!(result.executions[0].assertions.is_empty());
    }

    #[test]
    fn test_parse_report_malformed() {
        let err = parse_report("{ not json", "P").unwrap_err();
        assert!(matches!(err, RunError::Report { .. }));
    }

    #[test]
    fn test_command_args() {
        let input = Path::new("/tmp/in.json");
        let export = Path::new("/tmp/out.json");

        let args = NewmanRunner::new("newman").command_args(input, export, ReporterFormat::Json);
        assert_eq!(
            args,
            vec![
                "run",
                "/tmp/in.json",
                "--reporters",
                "json",
                "--reporter-json-export",
                "/tmp/out.json"
            ]
        );

        let args = NewmanRunner::new("newman")
            .insecure(true)
            .command_args(input, export, ReporterFormat::Json);
        assert_eq!(
            args.last().map(OsString::as_os_str),
            Some(std::ffi::OsStr::new("--insecure"))
        );
    }

    #[tokio::test]
    async fn test_missing_command_is_a_spawn_error() {
        let runner = NewmanRunner::new("split-runner-no-such-engine");
        let partition = Partition {
            original_index: 0,
            collection: Collection::new("API Users", vec![Item::request("R", "http://x")]),
        };

        let err = runner
            .run(&partition, ReporterFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }
}
