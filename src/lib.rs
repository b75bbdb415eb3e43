//! Web SQL console for MySQL with an AI database analyst.
//!
//! Serves a direct SQL passthrough endpoint and an agentic chat endpoint
//! where a hosted language model inspects the database through a fixed set
//! of read-only tools before answering.
//!
//! # Example
//!
//! ```no_run
//! use sqlweb::{
//!     config::ServerConfig,
//!     database::{MySqlDriver, QueryExecutor},
//!     security::{QueryGate, SqlValidator},
//!     server::{router, AppStateBuilder},
//!     tools,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!
//!     let driver = Arc::new(MySqlDriver::connect(config.database.clone()).await?);
//!     let validator = SqlValidator::new();
//!     let gate = Arc::new(QueryGate::new(config.security.max_concurrent_queries));
//!     let executor = QueryExecutor::new(
//!         Arc::clone(&driver),
//!         validator.clone(),
//!         Arc::clone(&gate),
//!         config.database.query_timeout,
//!     );
//!     let registry = Arc::new(tools::create_registry(
//!         Arc::clone(&driver),
//!         validator,
//!         gate,
//!         config.database.query_timeout,
//!     ));
//!
//!     let state = Arc::new(
//!         AppStateBuilder::new()
//!             .config(config.clone())
//!             .driver(driver)
//!             .executor(executor)
//!             .tools(registry)
//!             .build()
//!             .map_err(|e| anyhow::anyhow!(e))?,
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//!     axum::serve(listener, router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod config;
pub mod database;
pub mod envelope;
pub mod error;
pub mod security;
pub mod server;
pub mod session;
pub mod tools;

pub use config::{AiConfig, DatabaseConfig, DatabaseConfigBuilder, SecurityConfig, ServerConfig};
pub use envelope::Envelope;
pub use error::{Error, Result};
