//! Concurrent partition execution
//!
//! One task per partition, all started at once. The first failing partition
//! ends the wait for the others.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::runner::{ReporterFormat, RunError, Runner};
use crate::models::TaggedResult;
use crate::partition::Partition;
use crate::utils::Timer;

/// Pool settings
#[derive(Clone, Debug, Default)]
pub struct PoolOptions {
    /// Upper bound on partitions running at once, 0 for no bound
    pub max_concurrent: usize,
    pub partition_timeout: Option<Duration>,
    /// Abort partitions still running once one has failed
    pub cancel_on_failure: bool,
    pub format: ReporterFormat,
}

/// Runs partitions concurrently through a shared runner
pub struct RunnerPool<R> {
    runner: Arc<R>,
    options: PoolOptions,
}

impl<R: Runner> RunnerPool<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            options: PoolOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PoolOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every partition, returning results in completion order
    ///
    /// Returns the first [`RunError`] seen. Results of partitions that have
    /// not finished by then are dropped.
    pub async fn run_all(&self, partitions: Vec<Partition>) -> Result<Vec<TaggedResult>, RunError> {
        info!("Running {} partitions", partitions.len());

        let semaphore = (self.options.max_concurrent > 0)
            .then(|| Arc::new(Semaphore::new(self.options.max_concurrent)));
        let mut tasks = JoinSet::new();

        for partition in partitions {
            let runner = Arc::clone(&self.runner);
            let semaphore = semaphore.clone();
            let timeout = self.options.partition_timeout;
            let format = self.options.format;

            tasks.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire_owned()
                            .await
                            .map_err(|e| RunError::TaskFailed(e.to_string()))?,
                    ),
                    None => None,
                };

                let name = partition.name().to_string();
                let timer = Timer::start(format!("partition '{name}'"));

                let run = runner.run(&partition, format);
                let result = match timeout {
                    Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                        RunError::Timeout {
                            partition: name.clone(),
                            secs: limit.as_secs(),
                        }
                    })??,
                    None => run.await?,
                };

                info!(
                    "Partition '{}' finished: {} requests in {}ms",
                    name,
                    result.executions.len(),
                    timer.stop().as_millis()
                );

                Ok::<_, RunError>(TaggedResult {
                    original_index: partition.original_index,
                    partition: name,
                    result,
                })
            });
        }

        let mut results = Vec::with_capacity(tasks.len());

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| RunError::TaskFailed(e.to_string()))
                .and_then(|r| r);

            match outcome {
                Ok(tagged) => results.push(tagged),
                Err(err) => {
                    error!("{}", err);
                    if self.options.cancel_on_failure {
                        tasks.abort_all();
                    } else {
                        tasks.detach_all();
                    }
                    return Err(err);
                }
            }
        }

        Ok(results)
    }
}
