//! Shared application state.

use crate::ai::ChatClient;
use crate::config::ServerConfig;
use crate::database::{MySqlDriver, QueryExecutor};
use crate::session::SessionStore;
use crate::tools::ToolRegistry;
use std::sync::Arc;

pub struct AppState {
    pub config: ServerConfig,
    pub driver: Arc<MySqlDriver>,
    pub executor: QueryExecutor,
    pub tools: Arc<ToolRegistry>,
    pub sessions: SessionStore,
    /// `None` when `GEMINI_API_KEY` is not configured; the AI routes answer
    /// with a failure envelope in that case.
    pub chat: Option<Arc<dyn ChatClient>>,
}

pub struct AppStateBuilder {
    config: Option<ServerConfig>,
    driver: Option<Arc<MySqlDriver>>,
    executor: Option<QueryExecutor>,
    tools: Option<Arc<ToolRegistry>>,
    chat: Option<Arc<dyn ChatClient>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            driver: None,
            executor: None,
            tools: None,
            chat: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn driver(mut self, driver: Arc<MySqlDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn chat(mut self, chat: Option<Arc<dyn ChatClient>>) -> Self {
        self.chat = chat;
        self
    }

    pub fn build(self) -> Result<AppState, &'static str> {
        let config = self.config.ok_or("Config is required")?;
        let sessions = SessionStore::new(config.max_sessions);
        Ok(AppState {
            config,
            driver: self.driver.ok_or("Driver is required")?,
            executor: self.executor.ok_or("Executor is required")?,
            tools: self.tools.ok_or("Tool registry is required")?,
            sessions,
            chat: self.chat,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
