//! Collection execution
//!
//! Partitions a collection and runs the partitions concurrently through a
//! [`Runner`].

mod http_runner;
mod newman;
mod pool;
mod runner;

pub use http_runner::{evaluate, HttpRunner};
pub use newman::{parse_report, NewmanRunner};
pub use pool::{PoolOptions, RunnerPool};
pub use runner::{AnyRunner, ReporterFormat, RunError, Runner};

use anyhow::Result;
use tracing::info;

use crate::models::{Collection, TaggedResult};
use crate::partition::partition;

/// Partition `collection` and run every partition
///
/// Validation happens before anything is started; an invalid collection
/// never reaches the runner.
pub async fn run_collection<R: Runner>(
    collection: &mut Collection,
    pool: &RunnerPool<R>,
) -> Result<Vec<TaggedResult>> {
    let partitions = partition(collection)?;

    info!(
        "Collection '{}' split into {} partitions",
        collection.name(),
        partitions.len()
    );

    Ok(pool.run_all(partitions).await?)
}
