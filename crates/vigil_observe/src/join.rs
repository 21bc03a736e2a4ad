//! The one parallel-join primitive.
//!
//! Every fan-out in the harness goes through [`parallel_join`]: one tokio
//! task per item, all spawned before any is awaited, results returned in
//! input order once every task has finished. There is no pool; the task
//! count is the item count.

use futures::future::join_all;
use std::future::Future;
use tokio::task::JoinError;
use tracing::debug;

/// Spawns every future as its own task and waits for all of them.
///
/// A panicking task does not cancel its siblings; it shows up as the
/// `Err` at its own index.
pub async fn parallel_join<T, F>(tasks: Vec<F>) -> Vec<Result<T, JoinError>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    debug!(tasks = tasks.len(), "spawning parallel tasks");
    let handles: Vec<_> = tasks.into_iter().map(tokio::spawn).collect();
    join_all(handles).await
}
