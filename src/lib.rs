// Library for tests to access modules

pub mod config;
pub mod docker_repo;
pub mod filter;
pub mod models;
pub mod runtime;
pub mod version;
pub mod watcher;

pub use watcher::{ContainerWatcher, WatchConfig, WatchError, WatchHandle, watch_containers};
