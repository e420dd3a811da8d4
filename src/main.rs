use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use worktrack_core::SubCategoryCatalog;
use worktrack_server::{ServerConfig, TrackerEvent};
use worktrack_settings::WorktrackSettings;
use worktrack_store::{Database, SubCategoryRepo};
use worktrack_telemetry::TelemetryConfig;

/// Personal task tracker served as a single web page.
#[derive(Debug, Parser)]
#[command(name = "worktrack", version)]
struct Cli {
    /// Settings file (default: ~/.worktrack/settings.json).
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Override the HTTP port.
    #[arg(long, value_name = "N")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.settings {
        Some(path) => worktrack_settings::load_settings_from_path(path),
        None => worktrack_settings::load_settings(),
    }
    .context("failed to load settings")?;
    let mut settings = loaded.settings;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    init_logging(&settings)?;
    for ignored in &loaded.ignored_env {
        tracing::warn!(key = ignored.key, value = %ignored.value, "invalid env var, ignoring");
    }
    tracing::info!("starting worktrack");

    let db = Database::open_named(&settings.database.dir(), &settings.database.name)
        .context("failed to open database")?;

    let catalog = Arc::new(SubCategoryCatalog::from_preset(settings.catalog.preset));
    let stored = SubCategoryRepo::new(db.clone())
        .list()
        .context("failed to load sub-categories")?;
    tracing::info!(
        preset = %settings.catalog.preset,
        added = stored.len(),
        "sub-category catalog loaded"
    );
    catalog.extend(stored);

    let (event_tx, _) = broadcast::channel::<TrackerEvent>(1024);

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
        heartbeat_interval: Duration::from_millis(settings.server.heartbeat_interval_ms),
        request_timeout: Duration::from_millis(settings.server.request_timeout_ms),
        ..ServerConfig::default()
    };
    let handle = worktrack_server::start(config, db, catalog, event_tx)
        .await
        .context("failed to start server")?;

    tracing::info!(url = %format!("http://{}", handle.addr), "worktrack ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown(None).await;
    Ok(())
}

fn init_logging(settings: &WorktrackSettings) -> anyhow::Result<()> {
    let logging = &settings.logging;
    let config = TelemetryConfig::from_levels(
        &logging.level,
        logging.modules.iter().map(|(m, l)| (m.as_str(), l.as_str())),
        logging.json,
    )?;
    worktrack_telemetry::init_telemetry(&config)?;
    Ok(())
}
