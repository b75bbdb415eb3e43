//! AI tool definitions and registry.

pub mod query;
pub mod registry;
pub mod schema;

pub use query::{CountRecordsTool, ExecuteSelectTool, PreviewTableTool, SearchRecordsTool};
pub use registry::{ToolHandler, ToolRegistry};
pub use schema::{
    DescribeTableTool, GetForeignKeysTool, GetTableRelationshipsTool, ListTablesTool,
};

use crate::database::MySqlDriver;
use crate::error::{DatabaseError, DbResult, Error, Result};
use crate::security::{QueryGate, QueryPermit, SqlValidator};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared database access for the AI tools.
///
/// Every tool statement runs under the same concurrent-query gate and
/// per-query timeout as the direct endpoints, so a slow or piled-up tool
/// call cannot hang the tool-call loop or exceed the connection budget.
pub struct ToolContext {
    pub driver: Arc<MySqlDriver>,
    pub validator: SqlValidator,
    gate: Arc<QueryGate>,
    pub query_timeout: Duration,
}

impl ToolContext {
    pub fn new(
        driver: Arc<MySqlDriver>,
        validator: SqlValidator,
        gate: Arc<QueryGate>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            validator,
            gate,
            query_timeout,
        }
    }

    /// Reserve a slot against the shared concurrent-query cap.
    pub fn acquire(&self) -> Result<QueryPermit<'_>> {
        acquire_permit(&self.gate)
    }

    /// Run a driver call bounded by the configured per-query timeout.
    pub async fn timed<T>(&self, operation: impl Future<Output = DbResult<T>>) -> Result<T> {
        run_with_timeout(self.query_timeout, operation).await
    }
}

fn acquire_permit(gate: &QueryGate) -> Result<QueryPermit<'_>> {
    gate.try_acquire().map_err(Error::Security)
}

async fn run_with_timeout<T>(
    limit: Duration,
    operation: impl Future<Output = DbResult<T>>,
) -> Result<T> {
    let result = tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| DatabaseError::Timeout(limit.as_millis() as u64))?;
    Ok(result?)
}

/// Create and register all database-inspection tools.
pub fn create_registry(
    driver: Arc<MySqlDriver>,
    validator: SqlValidator,
    gate: Arc<QueryGate>,
    query_timeout: Duration,
) -> ToolRegistry {
    let context = Arc::new(ToolContext::new(driver, validator, gate, query_timeout));
    let registry = ToolRegistry::new();

    // Schema tools
    registry.register(ListTablesTool::new(Arc::clone(&context)));
    registry.register(DescribeTableTool::new(Arc::clone(&context)));
    registry.register(GetForeignKeysTool::new(Arc::clone(&context)));
    registry.register(GetTableRelationshipsTool::new(Arc::clone(&context)));

    // Data tools
    registry.register(ExecuteSelectTool::new(Arc::clone(&context)));
    registry.register(PreviewTableTool::new(Arc::clone(&context)));
    registry.register(CountRecordsTool::new(Arc::clone(&context)));
    registry.register(SearchRecordsTool::new(context));

    registry
}
