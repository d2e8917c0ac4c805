//! # callrelay
//!
//! Entry point for the status relay (`callrelay relay`) and the bot-status
//! ingestion gateway (`callrelay ingest`).

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use callrelay_core::init_subscriber;
use callrelay_ingest::{IngestConfig, IngestServer};
use callrelay_server::shutdown::ShutdownCoordinator;
use callrelay_server::{RelayServer, ServerConfig};
use callrelay_settings::{CallrelaySettings, load_settings_from_path, settings_path};
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::info;

/// Call-status relay.
#[derive(Parser, Debug)]
#[command(name = "callrelay", version, about = "Call-status relay and ingestion gateway")]
struct Cli {
    /// Settings file (default `~/.callrelay/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive (overrides settings; `RUST_LOG` still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the status relay (notification endpoint + subscriber connections).
    Relay {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind.
        #[arg(long)]
        port: Option<u16>,
        /// Serve Prometheus metrics on this port.
        #[arg(long)]
        metrics_port: Option<u16>,
    },
    /// Run the bot-status ingestion gateway.
    Ingest {
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind.
        #[arg(long)]
        port: Option<u16>,
        /// Base URL of the relay.
        #[arg(long)]
        relay_url: Option<String>,
        /// Serve Prometheus metrics on this port.
        #[arg(long)]
        metrics_port: Option<u16>,
    },
}

impl Cli {
    /// Command-line flags take precedence over file and environment.
    fn apply(&self, settings: &mut CallrelaySettings) {
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        match &self.command {
            Command::Relay {
                host,
                port,
                metrics_port,
            } => {
                if let Some(host) = host {
                    settings.relay.host.clone_from(host);
                }
                if let Some(port) = port {
                    settings.relay.port = *port;
                }
                if metrics_port.is_some() {
                    settings.relay.metrics_port = *metrics_port;
                }
            }
            Command::Ingest {
                host,
                port,
                relay_url,
                metrics_port,
            } => {
                if let Some(host) = host {
                    settings.ingest.host.clone_from(host);
                }
                if let Some(port) = port {
                    settings.ingest.port = *port;
                }
                if let Some(url) = relay_url {
                    settings.ingest.relay_url.clone_from(url);
                }
                if metrics_port.is_some() {
                    settings.ingest.metrics_port = *metrics_port;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    init_subscriber(&settings.logging.level, settings.logging.format);
    info!(settings = %path.display(), "settings loaded");

    match cli.command {
        Command::Relay { .. } => run_relay(&settings).await,
        Command::Ingest { .. } => run_ingest(&settings).await,
    }
}

async fn run_relay(settings: &CallrelaySettings) -> Result<()> {
    let server = RelayServer::new(ServerConfig::from(&settings.relay));
    let coordinator = server.shutdown().clone();

    let mut tasks = Vec::new();
    if let Some(port) = settings.relay.metrics_port {
        tasks.push(start_metrics(&settings.relay.host, port, &coordinator).await?);
    }

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to start status relay")?;
    tasks.push(handle);
    info!(%addr, "status relay ready");

    wait_for_shutdown_signal().await?;
    info!(
        subscribers = server.broadcaster().subscriber_count(),
        "Shutting down..."
    );
    let outcome = coordinator.drain(tasks, None).await;
    info!(?outcome, "Shutdown complete");
    Ok(())
}

async fn run_ingest(settings: &CallrelaySettings) -> Result<()> {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let server = IngestServer::with_relay(IngestConfig::from(&settings.ingest))
        .context("Failed to configure relay notifier")?
        .with_shutdown(coordinator.token());

    let mut tasks = Vec::new();
    if let Some(port) = settings.ingest.metrics_port {
        tasks.push(start_metrics(&settings.ingest.host, port, &coordinator).await?);
    }

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to start ingestion gateway")?;
    tasks.push(handle);
    info!(%addr, relay_url = %settings.ingest.relay_url, "ingestion gateway ready");

    wait_for_shutdown_signal().await?;
    info!("Shutting down...");
    let outcome = coordinator.drain(tasks, None).await;
    info!(?outcome, "Shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder and serve it on `host:port`.
async fn start_metrics(
    host: &str,
    port: u16,
    coordinator: &ShutdownCoordinator,
) -> Result<JoinHandle<()>> {
    let handle =
        callrelay_server::metrics::install_recorder().context("Failed to install metrics")?;
    let (addr, task) =
        callrelay_server::metrics::serve(&format!("{host}:{port}"), handle, coordinator.token())
            .await
            .context("Failed to start metrics exporter")?;
    info!(%addr, "metrics exporter ready");
    Ok(task)
}

async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(args: &[&str]) -> CallrelaySettings {
        let cli = Cli::parse_from(args);
        let mut settings = CallrelaySettings::default();
        cli.apply(&mut settings);
        settings
    }

    #[test]
    fn relay_subcommand_defaults() {
        let cli = Cli::parse_from(["callrelay", "relay"]);
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());
        assert!(matches!(
            cli.command,
            Command::Relay {
                host: None,
                port: None,
                metrics_port: None
            }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["callrelay"]).is_err());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["callrelay", "proxy"]).is_err());
    }

    #[test]
    fn relay_flags_override_settings() {
        let settings = apply(&[
            "callrelay",
            "relay",
            "--host",
            "127.0.0.1",
            "--port",
            "4001",
            "--metrics-port",
            "9100",
        ]);
        assert_eq!(settings.relay.host, "127.0.0.1");
        assert_eq!(settings.relay.port, 4001);
        assert_eq!(settings.relay.metrics_port, Some(9100));
        assert_eq!(settings.ingest.port, 3000);
    }

    #[test]
    fn ingest_flags_override_settings() {
        let settings = apply(&[
            "callrelay",
            "ingest",
            "--port",
            "8080",
            "--relay-url",
            "http://relay:3001",
        ]);
        assert_eq!(settings.ingest.port, 8080);
        assert_eq!(settings.ingest.relay_url, "http://relay:3001");
        assert_eq!(settings.relay.port, 3001);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "callrelay",
            "relay",
            "--log-level",
            "debug",
            "--config",
            "/etc/callrelay.json",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/callrelay.json")));
    }

    #[test]
    fn log_level_flag_overrides_settings() {
        let settings = apply(&["callrelay", "--log-level", "trace", "ingest"]);
        assert_eq!(settings.logging.level, "trace");
    }

    #[test]
    fn flags_apply_over_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"relay": {"port": 5000, "host": "10.0.0.1"}}"#).unwrap();

        let cli = Cli::parse_from(["callrelay", "relay", "--port", "6000"]);
        let mut settings = load_settings_from_path(&path).unwrap();
        cli.apply(&mut settings);
        assert_eq!(settings.relay.port, 6000);
        assert_eq!(settings.relay.host, "10.0.0.1");
    }

    #[test]
    fn invalid_relay_url_fails_validation() {
        let settings = apply(&["callrelay", "ingest", "--relay-url", "relay:3001"]);
        assert!(settings.validate().is_err());
    }
}
