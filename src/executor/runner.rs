//! Runner capability
//!
//! A runner executes one partition and hands back its own copy of the tree
//! together with a flat list of per-request outcomes.

use futures::future::Either;
use std::future::Future;
use thiserror::Error;

use super::http_runner::HttpRunner;
use super::newman::NewmanRunner;
use crate::models::ExecutionResult;
use crate::partition::Partition;

/// Failure to run a partition at all
///
/// Assertion failures are not run errors; they are part of a successful result.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to start runner for '{partition}': {source}")]
    Spawn {
        partition: String,
        source: std::io::Error,
    },

    #[error("I/O error while running '{partition}': {source}")]
    Io {
        partition: String,
        source: std::io::Error,
    },

    #[error("Runner failed for '{partition}': {message}")]
    Engine { partition: String, message: String },

    #[error("Could not read report for '{partition}': {message}")]
    Report { partition: String, message: String },

    #[error("Partition '{partition}' timed out after {secs} seconds")]
    Timeout { partition: String, secs: u64 },

    #[error("Runner task failed: {0}")]
    TaskFailed(String),
}

/// Report format requested from the runner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReporterFormat {
    #[default]
    Json,
}

impl ReporterFormat {
    /// Reporter name on the engine's command line
    pub fn reporter_name(self) -> &'static str {
        match self {
            ReporterFormat::Json => "json",
        }
    }
}

/// Executes a single partition
pub trait Runner: Send + Sync + 'static {
    fn run(
        &self,
        partition: &Partition,
        format: ReporterFormat,
    ) -> impl Future<Output = Result<ExecutionResult, RunError>> + Send;
}

/// Runner selected at startup
pub enum AnyRunner {
    Http(HttpRunner),
    Newman(NewmanRunner),
}

impl Runner for AnyRunner {
    fn run(
        &self,
        partition: &Partition,
        format: ReporterFormat,
    ) -> impl Future<Output = Result<ExecutionResult, RunError>> + Send {
        match self {
            AnyRunner::Http(runner) => Either::Left(runner.run(partition, format)),
            AnyRunner::Newman(runner) => Either::Right(runner.run(partition, format)),
        }
    }
}
