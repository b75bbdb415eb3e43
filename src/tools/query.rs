//! Data access tools: execute_select_query, preview_table_data,
//! count_records, search_records.

use crate::ai::ToolDefinition;
use crate::database::serialize::result_to_json;
use crate::error::{Error, Result, ToolError};
use crate::tools::registry::ToolHandler;
use crate::tools::ToolContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

/// Row cap appended to SELECT queries that carry no LIMIT of their own.
const SELECT_ROW_CAP: u32 = 100;

/// Default and maximum sample size for table previews.
const PREVIEW_DEFAULT: u32 = 5;
const PREVIEW_MAX: u32 = 50;

/// Result cap for substring searches.
const SEARCH_ROW_CAP: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ExecuteSelectArgs {
    pub query: String,
    /// Why the model wants to run this query; echoed in the result for
    /// transparency.
    pub purpose: String,
}

pub struct ExecuteSelectTool {
    ctx: Arc<ToolContext>,
}

impl ExecuteSelectTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for ExecuteSelectTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "execute_select_query".into(),
            description: "Execute a read-only SQL query. Only SELECT, SHOW \
                and DESCRIBE statements are allowed; a row limit is added \
                automatically when the query has none."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The read-only SQL query to execute"
                    },
                    "purpose": {
                        "type": "string",
                        "description": "Short explanation of why this query is needed"
                    }
                },
                "required": ["query", "purpose"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "execute_select_query"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: ExecuteSelectArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        self.ctx
            .validator
            .check_read_only(&args.query)
            .map_err(Error::Security)?;
        let query = self.ctx.validator.enforce_row_limit(&args.query, SELECT_ROW_CAP);

        let _permit = self.ctx.acquire()?;
        let result = self
            .ctx
            .driver
            .run_query_with_timeout(&query, self.ctx.query_timeout)
            .await?;
        let mut payload = result_to_json(&result);
        payload["purpose"] = json!(args.purpose);
        Ok(payload)
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewTableArgs {
    pub table_name: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct PreviewTableTool {
    ctx: Arc<ToolContext>,
}

impl PreviewTableTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for PreviewTableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "preview_table_data".into(),
            description: "Fetch a few sample rows from a table to see what \
                its data looks like."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Table to sample"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of rows to fetch (default 5, max 50)",
                        "minimum": 1,
                        "maximum": 50
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "preview_table_data"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: PreviewTableArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        self.ctx
            .validator
            .check_identifier(&args.table_name)
            .map_err(Error::Security)?;

        let limit = clamp_preview_limit(args.limit);
        let query = format!("SELECT * FROM `{}` LIMIT {}", args.table_name, limit);
        let _permit = self.ctx.acquire()?;
        let result = self
            .ctx
            .driver
            .run_query_with_timeout(&query, self.ctx.query_timeout)
            .await?;

        let mut payload = result_to_json(&result);
        payload["table"] = json!(args.table_name);
        payload["limit"] = json!(limit);
        Ok(payload)
    }
}

/// Clamp a requested preview size to [1, 50]; zero or absent means the
/// default of 5.
fn clamp_preview_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => PREVIEW_DEFAULT,
        Some(n) => n.clamp(1, PREVIEW_MAX),
    }
}

#[derive(Debug, Deserialize)]
pub struct CountRecordsArgs {
    pub table_name: String,
    #[serde(default)]
    pub where_clause: Option<String>,
}

pub struct CountRecordsTool {
    ctx: Arc<ToolContext>,
}

impl CountRecordsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for CountRecordsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "count_records".into(),
            description: "Count the rows in a table, optionally filtered by \
                a WHERE expression."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Table to count"
                    },
                    "where_clause": {
                        "type": "string",
                        "description": "Optional filter expression without the WHERE keyword, e.g. \"status = 'active'\""
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "count_records"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: CountRecordsArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        self.ctx
            .validator
            .check_identifier(&args.table_name)
            .map_err(Error::Security)?;
        if let Some(clause) = &args.where_clause {
            self.ctx
                .validator
                .check_filter_clause(clause)
                .map_err(Error::Security)?;
        }

        let _permit = self.ctx.acquire()?;
        let count = self
            .ctx
            .timed(
                self.ctx
                    .driver
                    .count_records(&args.table_name, args.where_clause.as_deref()),
            )
            .await?;

        Ok(json!({
            "table": args.table_name,
            "count": count,
            "filtered": args.where_clause.is_some(),
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRecordsArgs {
    pub table_name: String,
    pub search_column: String,
    pub search_value: String,
}

pub struct SearchRecordsTool {
    ctx: Arc<ToolContext>,
}

impl SearchRecordsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for SearchRecordsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_records".into(),
            description: "Find rows where a column contains a substring. \
                The match is case-insensitive and the result is capped."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Table to search"
                    },
                    "search_column": {
                        "type": "string",
                        "description": "Column to match against"
                    },
                    "search_value": {
                        "type": "string",
                        "description": "Substring to look for"
                    }
                },
                "required": ["table_name", "search_column", "search_value"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "search_records"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: SearchRecordsArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        self.ctx
            .validator
            .check_identifier(&args.table_name)
            .map_err(Error::Security)?;
        self.ctx
            .validator
            .check_identifier(&args.search_column)
            .map_err(Error::Security)?;

        let _permit = self.ctx.acquire()?;
        let result = self
            .ctx
            .timed(self.ctx.driver.search_records(
                &args.table_name,
                &args.search_column,
                &args.search_value,
                SEARCH_ROW_CAP,
            ))
            .await?;

        let mut payload = result_to_json(&result);
        payload["table"] = json!(args.table_name);
        payload["search_column"] = json!(args.search_column);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_limit_clamping() {
        assert_eq!(clamp_preview_limit(None), 5);
        assert_eq!(clamp_preview_limit(Some(0)), 5);
        assert_eq!(clamp_preview_limit(Some(1)), 1);
        assert_eq!(clamp_preview_limit(Some(25)), 25);
        assert_eq!(clamp_preview_limit(Some(50)), 50);
        assert_eq!(clamp_preview_limit(Some(1000)), 50);
    }

    #[test]
    fn test_execute_select_args_require_purpose() {
        let result: std::result::Result<ExecuteSelectArgs, _> =
            serde_json::from_value(json!({"query": "SELECT 1"}));
        assert!(result.is_err());

        let args: ExecuteSelectArgs = serde_json::from_value(json!({
            "query": "SELECT 1",
            "purpose": "smoke test"
        }))
        .unwrap();
        assert_eq!(args.purpose, "smoke test");
    }

    #[test]
    fn test_count_records_args_optional_filter() {
        let args: CountRecordsArgs =
            serde_json::from_value(json!({"table_name": "users"})).unwrap();
        assert!(args.where_clause.is_none());
    }
}
