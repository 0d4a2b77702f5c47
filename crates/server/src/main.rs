use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavepress_core::{
    load_config, validate_config, Config, ConversionPhase, FfmpegEngine, LogLine, Orchestrator,
    StatusCallback, TranscodeEngine,
};

use wavepress_server::api::{create_router, WsBroadcaster};
use wavepress_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let explicit_config = std::env::var("WAVEPRESS_CONFIG").map(PathBuf::from).ok();
    let config_path = explicit_config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // An explicitly named file must exist; the default path may be absent
    // since every section has full defaults.
    let config = if config_path.exists() || explicit_config.is_some() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Engine binary: {:?}", config.engine.ffmpeg_path);
    info!("Engine scratch dir: {:?}", config.engine.scratch_dir);

    // Create WebSocket broadcaster for real-time updates
    let ws_broadcaster = WsBroadcaster::default();

    // Create the engine binding and the orchestrator around it, wiring
    // status transitions into the broadcaster
    let engine: Arc<dyn TranscodeEngine> = Arc::new(FfmpegEngine::new(config.engine.clone()));
    let callback_broadcaster = ws_broadcaster.clone();
    let status_callback: StatusCallback =
        Arc::new(move |phase: ConversionPhase, status_line: &str| {
            callback_broadcaster.status_update(phase.as_str(), status_line);
        });
    let orchestrator = Arc::new(
        Orchestrator::new(engine, config.conversion.clone(), config.intake.clone())
            .with_status_callback(status_callback),
    );

    // Stream log-sink lines to WebSocket clients
    spawn_log_fanout(orchestrator.log_sink().subscribe(), ws_broadcaster.clone());

    // One-shot engine load, fire-and-forget. A failure is surfaced in the
    // status line and log; the trigger stays usable and conversions fail
    // downstream instead.
    {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.load_engine().await });
    }

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), orchestrator, ws_broadcaster));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting wavepress v{} on {}", VERSION, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Forward appended log lines to WebSocket clients.
fn spawn_log_fanout(mut rx: broadcast::Receiver<LogLine>, broadcaster: WsBroadcaster) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(line) => broadcaster.log_line(&line),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Clients can refetch the full buffer from /api/v1/logs
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
