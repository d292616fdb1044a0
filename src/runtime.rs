// Container runtime client seam: what the watcher needs from Docker (or a fake).

use crate::models::{ContainerEvent, ContainerState, EventAction, Watermark};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;

/// Lifecycle events since a watermark. An `Err` item means the subscription
/// broke and has to be re-established; the stream may also simply end.
pub type EventStream = BoxStream<'static, Result<ContainerEvent, RuntimeError>>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("docker: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("inspect of container {id} timed out after {timeout:?}")]
    LookupTimeout { id: String, timeout: Duration },

    #[error("event stream: {0}")]
    Stream(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Current state of one container. Callers bound this with their own
    /// deadline; implementations need not time out themselves.
    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError>;

    /// Subscribe to container events with one of `actions`, starting at `since`.
    fn subscribe_events(&self, since: Watermark, actions: &[EventAction]) -> EventStream;

    /// IDs of the containers currently running.
    async fn list_running(&self) -> Result<Vec<String>, RuntimeError>;
}
