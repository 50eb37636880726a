//! clockd - A presentation countdown timer server
//!
//! This is the main entry point for the clockd application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use clockd::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    state::{AppState, SessionSettings},
    sync::{FileStore, Session, SharedStore},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("clockd={},tower_http=info", config.log_level()))
        .init();

    info!("Starting clockd server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, allow_negative={}, speed={}x..{}x",
        config.host, config.port, config.tick_ms, config.allow_negative, config.min_speed, config.max_speed
    );

    let bounds = config.speed_bounds()?;

    let store = match &config.state_dir {
        Some(dir) => {
            info!("Persisting timer state under {}", dir.display());
            SharedStore::new(Arc::new(FileStore::new(dir)?))
        }
        None => SharedStore::in_memory(),
    };
    store.seed_settings(&SessionSettings::new(config.allow_negative))?;

    let session = Arc::new(Session::new(store, Arc::new(SystemClock), bounds));

    // Attach every surface and start its background tasks
    let state = Arc::new(AppState::new(
        session,
        config.port,
        config.host.clone(),
        config.tick_interval(),
    ));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints (surface = setup | display | moderator):");
    info!("  GET    /surfaces/:surface              - Surface view");
    info!("  POST   /surfaces/:surface/start        - Start a countdown");
    info!("  POST   /surfaces/:surface/pause-resume - Toggle pause");
    info!("  POST   /surfaces/:surface/adjust       - Add or remove time");
    info!("  POST   /surfaces/:surface/time-travel  - Finish at a time of day");
    info!("  PUT    /surfaces/:surface/settings     - Update settings");
    info!("  GET    /status                         - All surfaces");
    info!("  GET    /health                         - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
