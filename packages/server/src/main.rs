use std::path::PathBuf;

use anyhow::{Context, bail};
use pixur_server::config::{AppConfig, CONFIG_FILE};
use pixur_server::database::init_db;
use pixur_server::state::AppState;
use pixur_server::tasks::watch_config_file;
use tracing::{Level, info, warn};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Can't listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    if config.backend.token_secret.is_empty() {
        bail!("backend.token_secret must be set, run `pixur init` to generate one");
    }
    tokio::fs::create_dir_all(&config.backend.pix_path)
        .await
        .with_context(|| format!("Can't create pix dir {}", config.backend.pix_path.display()))?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db);

    let config_path = PathBuf::from(format!("{CONFIG_FILE}.toml"));
    let _watcher = if config_path.exists() {
        Some(watch_config_file(state.deps.config.clone(), config_path)?)
    } else {
        None
    };

    let app = pixur_server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Can't listen on {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
