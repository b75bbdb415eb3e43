//! Statement executor for the direct query endpoint.
//!
//! Accepts a raw statement, applies the denylist gate, classifies it by
//! leading verb, and executes it: read statements return rows as mappings,
//! anything else is committed and reported as an affected-row count. Every
//! failure is converted to an envelope at this boundary and never
//! propagated upward.

use crate::database::serialize::{result_to_json, row_to_json};
use crate::database::MySqlDriver;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::security::{QueryGate, SqlValidator, StatementKind};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct QueryExecutor {
    driver: Arc<MySqlDriver>,
    validator: SqlValidator,
    gate: Arc<QueryGate>,
    query_timeout: Duration,
}

impl QueryExecutor {
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

    pub fn driver(&self) -> &Arc<MySqlDriver> {
        &self.driver
    }

    /// Execute an arbitrary statement, returning a result envelope.
    #[instrument(skip(self, statement))]
    pub async fn execute(&self, statement: &str) -> Envelope {
        match self.try_execute(statement).await {
            Ok(payload) => Envelope::ok(payload),
            Err(e) => Envelope::failure(e.to_string()),
        }
    }

    async fn try_execute(&self, statement: &str) -> Result<Value> {
        self.validator.check(statement)?;
        let _permit = self.gate.try_acquire().map_err(Error::Security)?;

        match self.validator.classify(statement) {
            StatementKind::Read => {
                debug!("Read statement");
                let result = self
                    .driver
                    .run_query_with_timeout(statement, self.query_timeout)
                    .await?;
                let rows: Vec<Value> = result.rows.iter().map(row_to_json).collect();
                Ok(json!({
                    "data": rows,
                    "columns": result.columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
                    "row_count": result.row_count,
                    "execution_time_ms": result.execution_time_ms,
                }))
            }
            StatementKind::Write => {
                debug!("Write statement");
                let affected = self
                    .driver
                    .run_statement_with_timeout(statement, self.query_timeout)
                    .await?;
                Ok(json!({
                    "data": format!("Query OK. Rows affected: {affected}"),
                    "rows_affected": affected,
                }))
            }
        }
    }

    /// Execute a pre-validated read-only query and return the serialized
    /// result. Used by the AI tools, which run their own read-only gate
    /// before calling in.
    pub async fn run_read_only(&self, query: &str) -> Result<Value> {
        self.validator.check_read_only(query)?;
        let _permit = self.gate.try_acquire().map_err(Error::Security)?;
        let result = self
            .driver
            .run_query_with_timeout(query, self.query_timeout)
            .await?;
        Ok(result_to_json(&result))
    }
}
