use anyhow::{Context, Result};
use containerwatch::models::ContainerChange;
use containerwatch::watcher::ChangeHandler;
use containerwatch::*;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Writes each change as one JSON line on stdout.
struct JsonLinesHandler;

impl ChangeHandler for JsonLinesHandler {
    fn on_change(&self, change: ContainerChange) {
        match serde_json::to_string(&change) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
                    tracing::warn!(error = %e, "Failed to write container change");
                }
            }
            Err(e) => tracing::warn!(
                container_id = change.id(),
                error = %e,
                "Failed to serialize container change"
            ),
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting {}", version::banner());

    let app_config = config::AppConfig::load()?;
    let docker_repo = Arc::new(docker_repo::DockerRepo::connect(
        app_config.docker.socket_path.as_deref(),
    )?);
    docker_repo
        .ping()
        .await
        .context("docker daemon is not reachable")?;

    let image_filter = app_config
        .watch
        .image_filter()
        .map(|f| Arc::new(f) as Arc<dyn filter::ImageFilter>);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        }
    });

    watch_containers(
        cancel,
        docker_repo,
        Arc::new(JsonLinesHandler),
        image_filter,
        app_config.watch.watch_config(),
    )
    .await?;

    tracing::info!("Watch stopped");
    Ok(())
}
