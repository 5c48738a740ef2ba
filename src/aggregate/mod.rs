//! Result aggregation
//!
//! Puts partition results back into source order and turns every request
//! with failed assertions into a [`FailureReport`] located by its full path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Execution, ExecutionResult, FailureReport, TaggedResult};
use crate::resolver::{PathIndex, ResolveError};

/// Failure reports for a finished run, in source order
///
/// Results are sorted by their partition's original position; executions
/// keep the order the runner reported them in. Executions whose id is not in
/// their own result tree are logged and skipped.
pub fn aggregate(mut results: Vec<TaggedResult>) -> impl Iterator<Item = FailureReport> {
    results.sort_by_key(|tagged| tagged.original_index);

    results.into_iter().flat_map(|tagged| {
        let TaggedResult {
            partition,
            result: ExecutionResult {
                result_tree,
                executions,
            },
            ..
        } = tagged;
        let index = PathIndex::build(&result_tree);
        debug!("Indexed {} nodes of '{}'", index.len(), partition);

        executions
            .into_iter()
            .filter_map(move |execution| report_for(&index, &partition, execution))
    })
}

fn report_for(index: &PathIndex, partition: &str, execution: Execution) -> Option<FailureReport> {
    let Execution {
        item_id,
        item_name,
        assertions,
    } = execution;

    let failures: Vec<_> = assertions.into_iter().filter(|a| a.is_failure()).collect();
    if failures.is_empty() {
        return None;
    }

    let Some(ancestors) = index.lookup(&item_id) else {
        let err = ResolveError::UnknownItem {
            item_id,
            partition: partition.to_string(),
        };
        warn!("Skipping {} failed assertions of '{}': {}", failures.len(), item_name, err);
        return None;
    };

    let mut path = ancestors.to_vec();
    path.push(item_name.clone());

    Some(FailureReport {
        path,
        request_name: item_name,
        failures,
    })
}

/// Totals for one run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub partitions: usize,
    pub requests: usize,
    pub assertions: usize,
    pub failed_assertions: usize,
    /// Failing requests that resolve to a path, one per report
    pub failed_requests: usize,
    /// Failing requests skipped because their id is not in the result tree
    pub unresolved_requests: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new(results: &[TaggedResult], started_at: DateTime<Utc>) -> Self {
        let mut requests = 0;
        let mut assertions = 0;
        let mut failed_assertions = 0;
        let mut failed_requests = 0;
        let mut unresolved_requests = 0;

        for tagged in results {
            let executions = &tagged.result.executions;
            let index = executions
                .iter()
                .any(|e| e.failures().next().is_some())
                .then(|| PathIndex::build(&tagged.result.result_tree));

            for execution in executions {
                requests += 1;
                assertions += execution.assertions.len();
                let failed = execution.failures().count();
                failed_assertions += failed;
                if failed == 0 {
                    continue;
                }
                match index.as_ref().and_then(|i| i.lookup(&execution.item_id)) {
                    Some(_) => failed_requests += 1,
                    None => unresolved_requests += 1,
                }
            }
        }

        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            partitions: results.len(),
            requests,
            assertions,
            failed_assertions,
            failed_requests,
            unresolved_requests,
            started_at,
            finished_at,
            duration_ms,
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed_assertions == 0
    }
}
