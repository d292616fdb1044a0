// Docker runtime client via bollard

mod convert;

use crate::models::{ContainerState, EventAction, Watermark};
use crate::runtime::{ContainerRuntime, EventStream, RuntimeError};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{EventsOptions, InspectContainerOptions, ListContainersOptions};
use futures_util::StreamExt;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Client-side request timeout for the daemon connection, in seconds.
const DOCKER_CLIENT_TIMEOUT_SECS: u64 = 120;

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Connect to the local daemon; `socket_path` overrides the unix defaults
    /// (`DOCKER_HOST` or /var/run/docker.sock).
    pub fn connect(socket_path: Option<&str>) -> anyhow::Result<Self> {
        let docker = match socket_path {
            Some(path) => Docker::connect_with_unix(
                path,
                DOCKER_CLIENT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )?,
            None => Docker::connect_with_unix_defaults()?,
        };
        Ok(Self { docker })
    }

    /// Check the daemon answers; used at startup to fail fast.
    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "inspect_container"))]
    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError> {
        let resp = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        convert::state_from_inspect(resp)
            .ok_or_else(|| RuntimeError::Other(format!("inspect of {id} returned no container id")))
    }

    fn subscribe_events(&self, since: Watermark, actions: &[EventAction]) -> EventStream {
        // Same filter set as `docker stats` uses to follow containers.
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        filters.insert(
            "event".to_string(),
            actions.iter().map(|a| a.as_str().to_string()).collect(),
        );
        let options = EventsOptions {
            since: Some(since.to_since()),
            filters: Some(filters),
            ..Default::default()
        };

        self.docker
            .events(Some(options))
            .filter_map(|item| async move {
                match item {
                    Ok(msg) => {
                        let event = convert::event_from_message(&msg);
                        if event.is_none() {
                            debug!(action = ?msg.action, "Ignoring untracked docker event");
                        }
                        event.map(Ok)
                    }
                    Err(e) => Some(Err(RuntimeError::from(e))),
                }
            })
            .boxed()
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "list_running"))]
    async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let options = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }
}
