use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::{signal, sync::watch};
use tracing::{error, info, warn};

use ushare_api::{build_router, AppState};
use ushare_core::repositories::{BlobArea, MembershipStore};
use ushare_core::services::{AuthService, FileService, GroupService};
use ushare_core::Reaper;
use ushare_infrastructure::{create_pool, run_migrations, FsBlobArea, MemoryStore, PgMembershipStore};
use ushare_security::JwtService;
use ushare_shared::config::AppConfig;
use ushare_shared::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize telemetry (guard flushes the file writer on exit)
    let _log_guard = init_telemetry(&config.log).context("Failed to initialize telemetry")?;

    info!(env = %config.app.env, "UShare server starting...");

    // Metadata store
    let store: Arc<dyn MembershipStore> = if config.database.is_memory() {
        warn!("Using in-memory metadata store, state is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let pool = create_pool(&config.database)
            .await
            .context("Failed to connect to database")?;
        if config.database.run_migrations {
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
        }
        info!("Database connection established.");
        Arc::new(PgMembershipStore::new(pool))
    };

    // Blob area
    let fs_blobs = FsBlobArea::new(&config.storage.root);
    fs_blobs
        .ensure_root()
        .await
        .context("Failed to prepare storage root")?;
    if config.database.is_memory() {
        // Metadata starts empty, so directories from a previous run are orphans.
        warn!(
            root = %fs_blobs.root().display(),
            "Discarding group directories left by a previous in-memory run"
        );
        fs_blobs
            .discard_groups()
            .await
            .context("Failed to discard stale group directories")?;
    }
    let blobs: Arc<dyn BlobArea> = Arc::new(fs_blobs);

    let jwt = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.issuer.clone(),
        config.jwt.expiry_hours,
    ));

    // Reaper
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = if config.reaper.enabled {
        let reaper = Arc::new(Reaper::new(store.clone(), blobs.clone()));
        Some(reaper.spawn(
            Duration::from_secs(config.reaper.interval_seconds.max(1)),
            shutdown_rx,
        ))
    } else {
        warn!("Reaper disabled, deactivated groups will not be erased");
        None
    };

    // Create App State
    let state = AppState {
        auth: Arc::new(AuthService::new(
            store.clone(),
            jwt.clone(),
            config.policy.user_deletion,
        )),
        groups: Arc::new(GroupService::new(store.clone(), blobs.clone())),
        files: Arc::new(FileService::new(store, blobs)),
        jwt,
        config: Arc::new(config.clone()),
    };

    let app = build_router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped, waiting for the reaper");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = reaper_handle {
        if let Err(e) = handle.await {
            error!("Reaper task ended abnormally: {}", e);
        }
    }

    info!("UShare server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
