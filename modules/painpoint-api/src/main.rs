use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use painpoint_common::Config;
use painpoint_pipeline::{InsightPipeline, TextGenerator};

mod rest;

pub struct AppState {
    pub pipeline: InsightPipeline,
    /// Replaces the embedded test-mode report when set.
    pub fixture_path: Option<PathBuf>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        .route("/search", get(rest::api_search))
        .route("/run", post(rest::api_run))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path only (keywords stay out of the span)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("painpoint=info".parse()?))
        .init();

    let config = Config::from_env()?;
    config.log_redacted();

    let (pipeline, generator) = InsightPipeline::from_config(&config)?;

    // Resolve the model once. A miss is reported per request as "Model failed".
    match generator.warm_up().await {
        Ok(()) => info!(model = generator.model_name(), "Model ready"),
        Err(e) => warn!(model = generator.model_name(), error = %e, "Model unavailable at startup"),
    }

    let state = Arc::new(AppState {
        pipeline,
        fixture_path: config.fixture_path.clone(),
    });

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Painpoint API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
