// Container watcher: snapshot + event stream reconciled into one registry.
//
// The event stream subscribes first and opens the startup gate; only then is
// the running list taken, so no change between "list" and "subscribe" is lost.
// Both sides mutate the registry and dispatch changes under its lock.

mod dispatch;
mod fetcher;
mod gate;
mod registry;
mod snapshot;
mod stream;

pub use dispatch::ChangeHandler;
pub use registry::{Registry, RegistryGuard};
pub use snapshot::SnapshotSummary;

use crate::filter::ImageFilter;
use crate::models::ContainerState;
use crate::runtime::{ContainerRuntime, RuntimeError};
use fetcher::DetailFetcher;
use gate::StartupGate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Deadline for a single inspect call.
pub const DEFAULT_INSPECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Fixed pause before resubscribing after an event stream error.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("initial container listing failed: {0}")]
    ListContainers(#[source] RuntimeError),

    #[error("event stream task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Timing and fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub inspect_timeout: Duration,
    pub reconnect_delay: Duration,
    /// Upper bound on concurrent inspects during the snapshot; `None` = unbounded.
    pub max_concurrent_inspects: Option<usize>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            inspect_timeout: DEFAULT_INSPECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_concurrent_inspects: None,
        }
    }
}

/// State shared by the event stream task and the snapshot tasks.
pub(crate) struct Shared {
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) registry: Registry,
    pub(crate) fetcher: DetailFetcher,
    pub(crate) handler: Arc<dyn ChangeHandler>,
    pub(crate) gate: StartupGate,
    pub(crate) config: WatchConfig,
}

/// Builder for one watch. A registry lives exactly as long as its watch.
pub struct ContainerWatcher {
    runtime: Arc<dyn ContainerRuntime>,
    handler: Arc<dyn ChangeHandler>,
    filter: Option<Arc<dyn ImageFilter>>,
    config: WatchConfig,
}

impl ContainerWatcher {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, handler: Arc<dyn ChangeHandler>) -> Self {
        Self {
            runtime,
            handler,
            filter: None,
            config: WatchConfig::default(),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn ImageFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_config(mut self, config: WatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the event stream, then run the snapshot phase.
    ///
    /// Returns once every listed container has been inspected (or `cancel`
    /// fired), leaving the event stream running behind the returned handle.
    /// Fails if the running-container listing fails; in that case the event
    /// stream is stopped before returning and the handler has not been
    /// called. Also fails if the event stream task dies during startup.
    pub async fn start(self, cancel: CancellationToken) -> Result<WatchHandle, WatchError> {
        let ContainerWatcher {
            runtime,
            handler,
            filter,
            config,
        } = self;

        let registry = Registry::new();
        let shared = Arc::new(Shared {
            fetcher: DetailFetcher::new(runtime.clone(), filter, config.inspect_timeout),
            runtime,
            registry: registry.clone(),
            handler,
            gate: StartupGate::new(),
            config,
        });

        let mut reader = tokio::spawn(stream::run(shared.clone(), cancel.clone()));

        // The reader is watched too: if it dies before opening the gate the
        // snapshot would otherwise wait forever.
        let startup = tokio::select! {
            biased;
            _ = cancel.cancelled() => Startup::Cancelled,
            joined = &mut reader => Startup::ReaderExited(joined),
            result = snapshot::load(&shared) => Startup::Loaded(result),
        };

        let reader = match startup {
            Startup::Loaded(Ok(summary)) => {
                info!(
                    listed = summary.listed,
                    accepted = summary.accepted,
                    "Initial container snapshot loaded"
                );
                Some(reader)
            }
            Startup::Loaded(Err(e)) => {
                error!(error = %e, "Initial container listing failed");
                shared.gate.abort();
                reader.await?;
                return Err(WatchError::ListContainers(e));
            }
            Startup::ReaderExited(Err(e)) => {
                error!(error = %e, "Event stream task failed during startup");
                return Err(WatchError::Join(e));
            }
            // Only cancellation ends the reader cleanly at this point.
            Startup::ReaderExited(Ok(())) => {
                info!("Event stream stopped before the initial snapshot completed");
                None
            }
            Startup::Cancelled => {
                info!("Watch cancelled before the initial snapshot completed");
                Some(reader)
            }
        };

        Ok(WatchHandle {
            registry,
            cancel,
            reader,
        })
    }
}

enum Startup {
    Cancelled,
    ReaderExited(Result<(), tokio::task::JoinError>),
    Loaded(Result<SnapshotSummary, RuntimeError>),
}

/// Running watch. Dropping the handle does not stop the stream; cancel the
/// token (or call [`WatchHandle::cancel`]) for that.
pub struct WatchHandle {
    registry: Registry,
    cancel: CancellationToken,
    /// `None` once the reader has already been joined during startup.
    reader: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Copy of the current registry contents.
    pub async fn containers(&self) -> HashMap<String, Arc<ContainerState>> {
        self.registry.snapshot().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the event stream to stop (i.e. for cancellation).
    pub async fn join(self) -> Result<(), WatchError> {
        if let Some(reader) = self.reader {
            reader.await?;
        }
        Ok(())
    }
}

/// List and watch containers, calling `handler` for every change, until
/// `cancel` fires.
///
/// Returns an error when the initial listing fails (or the stream task
/// panics); stream errors are
/// retried from the last processed event and per-container inspect failures
/// are logged and skipped.
pub async fn watch_containers(
    cancel: CancellationToken,
    runtime: Arc<dyn ContainerRuntime>,
    handler: Arc<dyn ChangeHandler>,
    filter: Option<Arc<dyn ImageFilter>>,
    config: WatchConfig,
) -> Result<(), WatchError> {
    let mut watcher = ContainerWatcher::new(runtime, handler).with_config(config);
    if let Some(filter) = filter {
        watcher = watcher.with_filter(filter);
    }
    watcher.start(cancel).await?.join().await
}
