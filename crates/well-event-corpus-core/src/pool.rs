//! Bounded unordered fan-out over a set of independent tasks.
//!
//! Bulk loading and property counting both dispatch one I/O-bound task per
//! instance over a fixed-size pool and reduce the results with a commutative
//! operation, so completion order is irrelevant. The helper here collects in
//! completion order and fails fast: the first task error is returned
//! immediately and everything still pending is dropped, so no new work starts
//! after a failure and no partial result ever escapes.

use std::future::Future;

use futures::{StreamExt, stream};

/// Resolve the worker count for a batch of `n_tasks` independent tasks.
///
/// One worker per task up to the logical CPU count; at least one.
pub(crate) fn resolve_workers(n_tasks: usize) -> usize {
    let logical_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    n_tasks.clamp(1, logical_threads.max(1))
}

/// Run one task per item with bounded concurrency, collecting in completion
/// order.
///
/// Returns the first task error, dropping all tasks still queued or in
/// flight; on success returns every task's output (order is the completion
/// order, not the input order).
pub(crate) async fn run_unordered<I, T, E, F, Fut>(items: I, mut task: F) -> Result<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let tasks: Vec<Fut> = items.into_iter().map(&mut task).collect();
    let workers = resolve_workers(tasks.len());

    let mut pending = stream::iter(tasks).buffer_unordered(workers);
    let mut results = Vec::new();
    while let Some(result) = pending.next().await {
        results.push(result?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolve_workers_is_bounded() {
        assert_eq!(resolve_workers(0), 1);
        assert_eq!(resolve_workers(1), 1);
        let logical = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(resolve_workers(10_000), logical.max(1));
    }

    #[tokio::test]
    async fn run_unordered_collects_all_results() {
        let results: Result<Vec<u32>, ()> =
            run_unordered(0..8u32, |i| async move { Ok(i * 2) }).await;
        let mut results = results.expect("all tasks succeed");
        results.sort_unstable();
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn run_unordered_fails_fast_on_first_error() {
        let completed = AtomicUsize::new(0);
        let result: Result<Vec<u32>, String> = run_unordered(0..64u32, |i| {
            let completed = &completed;
            async move {
                if i == 0 {
                    return Err(format!("task {i} failed"));
                }
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(i)
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "task 0 failed");
        // Fail-fast: far fewer than 63 successful tasks were collected.
        assert!(completed.load(Ordering::SeqCst) < 63);
    }
}
