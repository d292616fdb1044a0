// Docker container models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Docker container status; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Exited,
    Paused,
    Restarting,
    #[serde(other)]
    Unknown,
}

/// Last known attributes of one container.
///
/// Values are never edited in place: the registry swaps in a fresh
/// `Arc<ContainerState>` on every accepted inspect, so a state already handed
/// to a change handler stays exactly as it was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    pub id: String,
    pub name: String,
    /// Image reference as configured (e.g. "nginx:1.27"); what image filters see.
    pub image: String,
    #[serde(default)]
    pub image_id: String,
    pub status: ContainerStatus,
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ContainerState {
    /// Minimal running state, mostly useful for tests and fakes.
    pub fn running(id: impl Into<String>, image: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            image: image.into(),
            image_id: String::new(),
            status: ContainerStatus::Running,
            pid: 0,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: ContainerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}
