//! Transaction Janitor Task
//!
//! Background task that periodically drops transactions nobody committed or
//! rolled back.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TransCache;

/// Spawns a background task that purges abandoned transactions.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs. Open transactions older than `timeout` are discarded without
/// being applied; closed markers older than `timeout` are forgotten.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(TransCache::<serde_json::Value>::new(HashMap::new()));
/// let janitor = spawn_janitor_task(cache.clone(), 30, Duration::from_secs(300));
/// // Later, during shutdown:
/// janitor.abort();
/// ```
pub fn spawn_janitor_task<V>(
    cache: Arc<TransCache<V>>,
    interval_secs: u64,
    timeout: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    spawn_with_interval(cache, Duration::from_secs(interval_secs.max(1)), timeout)
}

fn spawn_with_interval<V>(
    cache: Arc<TransCache<V>>,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting transaction janitor with interval of {:?}, timeout {:?}",
            interval, timeout
        );

        loop {
            tokio::time::sleep(interval).await;

            let purged = cache.purge_abandoned_transactions(timeout);

            if purged > 0 {
                info!("Transaction janitor: dropped {} stale transactions", purged);
            } else {
                debug!("Transaction janitor: nothing to drop");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::error::CacheError;

    fn trans_cache() -> Arc<TransCache<String>> {
        Arc::new(TransCache::new(HashMap::new()))
    }

    #[tokio::test]
    async fn test_janitor_drops_abandoned_transactions() {
        let cache = trans_cache();
        let id = cache.begin_transaction();
        cache.set_deferred(&id, "p", "k", "v".into(), &[]).unwrap();

        let handle = spawn_with_interval(
            cache.clone(),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.open_transactions(), 0);
        assert_eq!(
            cache.commit_transaction(&id),
            Err(CacheError::TransactionNotFound(id))
        );
        assert!(!cache.has_item("p", "k"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_janitor_keeps_fresh_transactions() {
        let cache = trans_cache();
        let id = cache.begin_transaction();

        let handle = spawn_with_interval(
            cache.clone(),
            Duration::from_millis(20),
            Duration::from_secs(3600),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.open_transactions(), 1);
        assert!(cache.commit_transaction(&id).is_ok());

        handle.abort();
    }

    #[tokio::test]
    async fn test_janitor_can_be_aborted() {
        let handle = spawn_janitor_task(trans_cache(), 1, Duration::from_secs(1));

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
