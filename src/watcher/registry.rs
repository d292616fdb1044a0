// Authoritative map of container id -> last accepted state

use crate::models::ContainerState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared registry of known containers.
///
/// The map is only reachable through [`RegistryGuard`], so every read-modify
/// sequence (look up previous, inspect, store, dispatch) happens under one
/// lock acquisition.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<String, Arc<ContainerState>>>>,
}

pub struct RegistryGuard<'a> {
    map: MutexGuard<'a, HashMap<String, Arc<ContainerState>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            map: self.inner.lock().await,
        }
    }

    /// Point-in-time copy of the registry contents.
    pub async fn snapshot(&self) -> HashMap<String, Arc<ContainerState>> {
        self.inner.lock().await.clone()
    }
}

impl RegistryGuard<'_> {
    pub fn get(&self, id: &str) -> Option<Arc<ContainerState>> {
        self.map.get(id).cloned()
    }

    /// Insert or replace; returns the value that was there before.
    pub fn upsert(&mut self, state: Arc<ContainerState>) -> Option<Arc<ContainerState>> {
        self.map.insert(state.id.clone(), state)
    }

    /// Remove `id`, returning its last state if it was known.
    pub fn remove(&mut self, id: &str) -> Option<Arc<ContainerState>> {
        self.map.remove(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
