//! Server binary entry point.

use anyhow::Result;
use sqlweb::ai::{ChatClient, GeminiClient, GeminiConfig};
use sqlweb::config::ServerConfig;
use sqlweb::database::{MySqlDriver, QueryExecutor};
use sqlweb::security::{QueryGate, SqlValidator};
use sqlweb::server::{router, AppStateBuilder};
use sqlweb::tools;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::from_env()?;

    // The database is required; a failed connection is fatal at startup.
    let driver = Arc::new(MySqlDriver::connect(config.database.clone()).await?);
    info!("Connected to database '{}'", driver.database_name());

    let validator = SqlValidator::new().max_query_length(config.security.max_query_length);
    let gate = Arc::new(QueryGate::new(config.security.max_concurrent_queries));
    let executor = QueryExecutor::new(
        Arc::clone(&driver),
        validator.clone(),
        Arc::clone(&gate),
        config.database.query_timeout,
    );

    // The tools share the executor's gate so the concurrency cap holds
    // across both the direct and the AI paths.
    let registry = Arc::new(tools::create_registry(
        Arc::clone(&driver),
        validator,
        gate,
        config.database.query_timeout,
    ));
    info!("Registered {} AI tools", registry.len());

    // A missing API key disables the AI routes but not the direct query path.
    let chat: Option<Arc<dyn ChatClient>> = match &config.ai.api_key {
        Some(key) => {
            info!("AI routes enabled with model {}", config.ai.model);
            Some(Arc::new(GeminiClient::new(
                GeminiConfig::new(key.clone())
                    .with_model(config.ai.model.clone())
                    .with_max_output_tokens(config.ai.max_output_tokens)
                    .with_temperature(config.ai.temperature),
            )))
        }
        None => {
            warn!("GEMINI_API_KEY not set; AI routes are disabled");
            None
        }
    };

    let bind_addr = config.bind_addr;
    let state = Arc::new(
        AppStateBuilder::new()
            .config(config)
            .driver(driver)
            .executor(executor)
            .tools(registry)
            .chat(chat)
            .build()
            .map_err(|e| anyhow::anyhow!(e))?,
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Failed to install Ctrl+C handler");
    }
    info!("Shutdown signal received");
}
