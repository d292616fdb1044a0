// Initial snapshot: list running containers once and inspect them concurrently

use crate::runtime::RuntimeError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::Shared;
use super::dispatch::dispatch;

/// Outcome of the snapshot phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub listed: usize,
    pub accepted: usize,
}

/// Waits for the event stream to be subscribed, then lists and inspects every
/// running container. A listing failure is returned as-is; per-container
/// failures and exclusions are skipped.
pub(crate) async fn load(shared: &Arc<Shared>) -> Result<SnapshotSummary, RuntimeError> {
    if !shared.gate.wait_open().await {
        return Err(RuntimeError::Other(
            "event stream stopped before it was subscribed".to_string(),
        ));
    }

    let ids = shared.runtime.list_running().await?;
    let listed = ids.len();
    info!(containers = listed, "Listed running containers");

    let limit = shared
        .config
        .max_concurrent_inspects
        .map(|n| Arc::new(Semaphore::new(n)));

    let mut tasks = JoinSet::new();
    for id in ids {
        let shared = shared.clone();
        let limit = limit.clone();
        tasks.spawn(async move {
            let _permit = match limit {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            discover(&shared, &id).await
        });
    }

    let mut accepted = 0;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(true) => accepted += 1,
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Snapshot inspect task failed"),
        }
    }

    Ok(SnapshotSummary { listed, accepted })
}

/// Inspect and dispatch one listed container. If the event stream already
/// stored it, this is reported as an update rather than a second discovery.
async fn discover(shared: &Shared, id: &str) -> bool {
    let mut registry = shared.registry.lock().await;
    let previous = registry.get(id);
    match shared.fetcher.fetch(&mut registry, id).await {
        Some(current) => {
            if previous.is_some() {
                debug!(container_id = id, "Container already seen by event stream");
            }
            dispatch(shared.handler.as_ref(), previous, Some(current));
            true
        }
        None => false,
    }
}
