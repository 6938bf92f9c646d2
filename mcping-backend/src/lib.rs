pub mod circuit_breaker;
pub mod config;
mod error;
pub mod helpers;
pub mod lookup;
pub mod pipeline;
pub mod retry;
mod routes;
pub mod sweeper;
pub mod turnstile;
mod validation;

pub use error::{AppError, ErrorResponse};

use anyhow::Context;
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use mcping_motd::ValidationOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::lookup::McsrvstatLookup;
use crate::pipeline::{PipelineConfig, StatusPipeline};
use crate::turnstile::{CloudflareTurnstile, TurnstileVerifier};

pub struct AppState {
    pub pipeline: Arc<StatusPipeline>,
    pub motd_options: ValidationOptions,
}

/// Create the application router with the given state and limits
pub fn create_app(state: AppState, request_body_limit: usize, request_timeout: Duration) -> Router {
    let state = Arc::new(state);

    let motd_routes = Router::new()
        .route("/preview", post(routes::preview))
        .route("/convert", post(routes::convert_format))
        .route("/gradient", post(routes::gradient_text))
        .route("/center", post(routes::center))
        .route("/share", post(routes::share).get(routes::open_shared));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/api/status", post(routes::status))
        .nest("/api/motd", motd_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the status pipeline with the production lookup and, when enabled,
/// the Cloudflare Turnstile verifier.
pub fn build_pipeline(config: &Config, shutdown: CancellationToken) -> anyhow::Result<StatusPipeline> {
    let lookup = McsrvstatLookup::new(config.status_api_url.clone(), config.query_timeout)
        .context("failed to build status api client")?;

    let turnstile: Option<Arc<dyn TurnstileVerifier>> = if config.turnstile_enabled {
        let secret = config
            .turnstile_secret_key
            .clone()
            .context("TURNSTILE_ENABLED is set but TURNSTILE_SECRET_KEY is missing")?;
        Some(Arc::new(
            CloudflareTurnstile::new(secret).context("failed to build turnstile client")?,
        ))
    } else {
        None
    };

    let pipeline_config = PipelineConfig {
        rate_limit: config.rate_limit(),
        cache: config.cache(),
        retry: config.retry(),
        circuit_breaker: config.circuit_breaker(),
        lookup_deadline: Some(config.lookup_deadline()),
    };

    Ok(StatusPipeline::new(
        pipeline_config,
        Arc::new(lookup),
        turnstile,
        shutdown,
    ))
}
