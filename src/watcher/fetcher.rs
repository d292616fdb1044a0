// Inspect one container and store it if the image filter accepts it

use crate::filter::ImageFilter;
use crate::models::ContainerState;
use crate::runtime::{ContainerRuntime, RuntimeError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::registry::RegistryGuard;

pub(crate) struct DetailFetcher {
    runtime: Arc<dyn ContainerRuntime>,
    filter: Option<Arc<dyn ImageFilter>>,
    timeout: Duration,
}

impl DetailFetcher {
    pub(crate) fn new(
        runtime: Arc<dyn ContainerRuntime>,
        filter: Option<Arc<dyn ImageFilter>>,
        timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            filter,
            timeout,
        }
    }

    /// Inspect `id` with a fixed deadline and write the result into the
    /// registry. Returns the stored state, or `None` if the inspect failed,
    /// timed out, or the image is excluded. Dispatch is left to the caller.
    pub(crate) async fn fetch(
        &self,
        registry: &mut RegistryGuard<'_>,
        id: &str,
    ) -> Option<Arc<ContainerState>> {
        let inspected = tokio::time::timeout(self.timeout, self.runtime.inspect_container(id))
            .await
            .unwrap_or_else(|_| {
                Err(RuntimeError::LookupTimeout {
                    id: id.to_string(),
                    timeout: self.timeout,
                })
            });

        // The container may already be gone by the time we inspect it.
        let state = match inspected {
            Ok(state) => state,
            Err(e) => {
                warn!(container_id = id, error = %e, "Could not inspect container");
                return None;
            }
        };

        if let Some(filter) = &self.filter
            && filter.excludes(&state.image)
        {
            debug!(container_id = id, image = %state.image, "Container excluded by image filter");
            return None;
        }

        let state = Arc::new(state);
        registry.upsert(state.clone());
        debug!(container_id = id, "Updated docker container");
        Some(state)
    }
}
