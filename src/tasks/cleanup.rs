//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired memoized results.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::memo::{CleanupOutcome, MemoizationManager};

/// Spawns a background task that periodically runs `cleanup_all` on `manager`.
///
/// Lookups already drop expired entries lazily; the sweep reclaims entries
/// that are never read again. Must be called from within a tokio runtime.
///
/// The task only holds a weak reference between sweeps, so it exits on its
/// own once the last `Arc` to the manager is dropped.
///
/// # Arguments
/// * `manager` - The manager to sweep
/// * `interval` - Delay between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// when the owner is torn down.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(MemoizationManager::<serde_json::Value>::new());
/// let cleanup_handle = spawn_cleanup_task(manager.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(
    manager: Arc<MemoizationManager<V>>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let owner = manager.owner();
    let manager = Arc::downgrade(&manager);

    tokio::spawn(async move {
        info!(
            owner = %owner,
            "Starting memo cleanup task with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            // Stop once the owner is gone
            let Some(manager) = manager.upgrade() else {
                debug!(owner = %owner, "Memo cleanup: manager dropped, stopping task");
                break;
            };

            let outcomes = manager.cleanup_all();
            drop(manager);

            let removed: usize = outcomes
                .values()
                .filter_map(|outcome| match outcome {
                    CleanupOutcome::Cleaned { removed } => Some(*removed),
                    CleanupOutcome::Failed { .. } => None,
                })
                .sum();
            let failed = outcomes.values().filter(|o| !o.is_success()).count();

            if failed > 0 {
                warn!("Memo cleanup: {} operation caches failed to sweep", failed);
            }
            if removed > 0 {
                info!("Memo cleanup: removed {} expired results", removed);
            } else {
                debug!("Memo cleanup: no expired results found");
            }
        }
    })
}
