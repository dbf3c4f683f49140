pub mod api;
pub mod catalog;
pub mod config;
pub mod geo;
pub mod models;
pub mod pipeline;
pub mod session;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::server::ServerError;
use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::gateway::{GatewayError, GeminiClient, ModelGateway, RetryPolicy};
use crate::pipeline::{MatchOptions, TriagePipeline};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Cannot build model client: {0}")]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Cannot start async runtime: {0}")]
    Runtime(std::io::Error),
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire catalog, model gateway and pipeline into an API context.
pub fn build_context(config: AppConfig) -> Result<ApiContext, StartupError> {
    let catalog = catalog::load_cached(&config.catalog_path);

    let client = GeminiClient::from_config(&config)?;
    if !client.has_api_key() {
        tracing::warn!("GOOGLE_API_KEY is not set; triage will answer with the not-configured notice");
    }
    let gateway = ModelGateway::new(
        Arc::new(client),
        RetryPolicy::from_config(&config),
        config.tip_model.clone(),
    );
    let pipeline = TriagePipeline::new(gateway, catalog, MatchOptions::from_config(&config));

    Ok(ApiContext::new(pipeline, config))
}

/// Start the service and block until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    tracing::info!(
        models = ?config.model_candidates,
        catalog = %config.catalog_path.display(),
        radius_km = ?config.radius_km,
        cap = ?config.match_cap,
        "Configuration loaded"
    );

    let ctx = build_context(config)?;
    let runtime = tokio::runtime::Runtime::new().map_err(StartupError::Runtime)?;
    let result = runtime.block_on(serve(ctx.clone()));

    // The blocking HTTP client inside `ctx` must be dropped outside the runtime.
    drop(runtime);
    drop(ctx);
    result
}

async fn serve(ctx: ApiContext) -> Result<(), StartupError> {
    let bind_addr = ctx.config.bind_addr.clone();
    let mut server = api::start_api_server(ctx, &bind_addr).await?;
    tracing::info!(addr = %server.addr, started_at = %server.started_at, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}
