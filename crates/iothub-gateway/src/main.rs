use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use iothub_core::config::HubConfig;
use iothub_core::{Clock, SystemClock};
use iothub_gateway::{app, db};
use iothub_registry::ResourceRegistry;
use iothub_scheduler::{LogDispatcher, ScheduleMatcher};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "iothub_gateway=info,iothub_scheduler=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: IOTHUB_CONFIG env > ~/.iothub/iothub.toml, plus IOTHUB_* overrides
    let config_path = std::env::var("IOTHUB_CONFIG").ok();
    // a missing file is fine, a malformed one is not
    let config = HubConfig::load(config_path.as_deref()).context("loading config")?;

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let db_path = config.database.path.clone();
    db::ensure_parent_dir(&db_path).context("creating database directory")?;
    info!(path = %db_path, "opening SQLite database");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler_cfg = config.scheduler.clone();
    let registry_cfg = config.registry.clone();

    let state = Arc::new(app::AppState::open(config, Arc::clone(&clock))?);
    let router = app::build_router(state);

    // the matcher reads through its own connection so it never waits on handlers
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if scheduler_cfg.enabled {
        let registry = ResourceRegistry::new(
            db::connect(&db_path).context("opening matcher db")?,
            registry_cfg,
        )?;
        let matcher = ScheduleMatcher::new(
            Arc::new(registry),
            Arc::new(LogDispatcher),
            clock,
            Duration::from_secs(scheduler_cfg.dispatch_timeout_secs),
        );
        tokio::spawn(async move { matcher.run(shutdown_rx).await });
    } else {
        info!("schedule matcher disabled by config");
    }

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("IoT Hub gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    // signal matcher to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}
