use mcping_backend::config::Config;
use mcping_backend::sweeper::spawn_sweeper;
use mcping_backend::{AppState, build_pipeline, create_app};
use mcping_motd::{DEFAULT_MAX_LINES, ValidationOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting mcping backend server...");
    // Load configuration from environment variables or use defaults
    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, body_limit={}KB, timeout={}s, status_api={}",
        config.port,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
        config.status_api_url
    );
    tracing::info!(
        "Limits: {}/min per ip, {}s hostname cooldown, cache={} ({}s), turnstile={}, circuit_breaker={}",
        config.requests_per_minute,
        config.cooldown_seconds,
        config.cache_enabled,
        config.cache_duration.as_secs(),
        config.turnstile_enabled,
        config.circuit_breaker_enabled
    );

    let shutdown = CancellationToken::new();
    let pipeline = Arc::new(build_pipeline(&config, shutdown.clone())?);
    let sweeper = spawn_sweeper(pipeline.clone(), config.sweep_interval, shutdown.clone());

    let state = AppState {
        pipeline,
        motd_options: ValidationOptions {
            max_line_width: config.motd_max_line_width,
            max_lines: DEFAULT_MAX_LINES,
        },
    };
    let app = create_app(state, config.request_body_limit, config.request_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    let graceful = shutdown.clone();
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { graceful.cancelled().await })
    .await;
    if let Err(e) = &result {
        tracing::error!("Axum server error: {}", e);
    }

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!("Sweeper task failed: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(result?)
}
