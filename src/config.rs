use crate::filter::ImagePatternFilter;
use crate::watcher::WatchConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerConfig {
    /// Unix socket of the daemon; bollard's defaults (DOCKER_HOST, then
    /// /var/run/docker.sock) when unset.
    pub socket_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_inspect_timeout_ms")]
    pub inspect_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    pub max_concurrent_inspects: Option<usize>,
    /// Glob patterns of images to ignore; `!pattern` re-includes.
    #[serde(default)]
    pub excluded_images: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            inspect_timeout_ms: default_inspect_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_concurrent_inspects: None,
            excluded_images: Vec::new(),
        }
    }
}

fn default_inspect_timeout_ms() -> u64 {
    5000
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

impl WatchSection {
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            inspect_timeout: Duration::from_millis(self.inspect_timeout_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_concurrent_inspects: self.max_concurrent_inspects,
        }
    }

    /// `None` when no patterns are configured.
    pub fn image_filter(&self) -> Option<ImagePatternFilter> {
        let filter = ImagePatternFilter::new(&self.excluded_images);
        (!filter.is_empty()).then_some(filter)
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE` (default `config.toml`). A missing default file
    /// means all defaults; a missing explicit file is an error.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string("config.toml") {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                Err(e) => Err(anyhow::anyhow!("reading config config.toml: {}", e)),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.docker.socket_path {
            anyhow::ensure!(
                !path.is_empty(),
                "docker.socket_path must be non-empty when set"
            );
        }
        anyhow::ensure!(
            self.watch.inspect_timeout_ms > 0,
            "watch.inspect_timeout_ms must be > 0, got {}",
            self.watch.inspect_timeout_ms
        );
        anyhow::ensure!(
            self.watch.reconnect_delay_ms > 0,
            "watch.reconnect_delay_ms must be > 0, got {}",
            self.watch.reconnect_delay_ms
        );
        if let Some(n) = self.watch.max_concurrent_inspects {
            anyhow::ensure!(
                n > 0,
                "watch.max_concurrent_inspects must be > 0 when set, got {}",
                n
            );
        }
        Ok(())
    }
}
