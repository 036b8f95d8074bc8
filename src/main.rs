use rust_trading_monitor::api::{run_server, AppState};
use rust_trading_monitor::services::keep_alive::KeepAliveService;
use rust_trading_monitor::services::view::SnapshotView;
use rust_trading_monitor::{AppConfig, MonitorClient, WsTransport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Setup Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting Trading Monitor...");

    let config = AppConfig::load()?;
    info!("Loaded Configuration: {:?}", config);

    let client = MonitorClient::new(&config, Box::new(WsTransport));
    let handle = client.handle();

    // Subscribe before the manager starts so the first transitions are seen
    let view = SnapshotView::default();
    let view_task = view.attach(handle.bus());
    let manager_task = client.spawn();

    let _keep_alive = match &config.keep_alive_cron {
        Some(cron) => match KeepAliveService::new(handle.clone()).start_with_schedule(cron).await {
            Ok(scheduler) => Some(scheduler),
            Err(e) => {
                warn!("⚠️ Failed to start keep-alive: {}", e);
                None
            }
        },
        None => {
            info!("ℹ️ keep_alive_cron not set - keep-alive disabled");
            None
        }
    };

    if config.api_enabled {
        let state = Arc::new(AppState {
            client: handle.clone(),
            view: view.clone(),
        });
        let addr = config.api_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(state, &addr).await {
                error!("❌ Status API stopped: {}", e);
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutting down...");

    handle.shutdown().ok();
    manager_task.await.ok();
    view_task.abort();

    Ok(())
}
