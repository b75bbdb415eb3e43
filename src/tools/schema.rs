//! Schema inspection tools: list_tables, describe_table, get_foreign_keys,
//! get_table_relationships.

use crate::ai::ToolDefinition;
use crate::error::{Error, Result, ToolError};
use crate::tools::registry::ToolHandler;
use crate::tools::ToolContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub struct ListTablesTool {
    ctx: Arc<ToolContext>,
}

impl ListTablesTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_tables".into(),
            description: "List all tables in the connected database.".into(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "list_tables"))]
    async fn execute(&self, _arguments: Value) -> Result<Value> {
        let _permit = self.ctx.acquire()?;
        let tables = self.ctx.timed(self.ctx.driver.list_tables()).await?;
        let count = tables.len();
        Ok(json!({
            "tables": tables,
            "count": count,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct DescribeTableArgs {
    pub table_name: String,
}

pub struct DescribeTableTool {
    ctx: Arc<ToolContext>,
}

impl DescribeTableTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for DescribeTableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "describe_table".into(),
            description: "Get column definitions for a table: name, type, \
                nullability, key, default value and extra attributes."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to describe"
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "describe_table"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: DescribeTableArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        self.ctx
            .validator
            .check_identifier(&args.table_name)
            .map_err(Error::Security)?;

        let _permit = self.ctx.acquire()?;
        let columns = self
            .ctx
            .timed(self.ctx.driver.describe_table(&args.table_name))
            .await?;
        Ok(json!({
            "table": args.table_name,
            "columns": columns,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub struct GetForeignKeysArgs {
    pub table_name: String,
}

pub struct GetForeignKeysTool {
    ctx: Arc<ToolContext>,
}

impl GetForeignKeysTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for GetForeignKeysTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_foreign_keys".into(),
            description: "Get the outgoing foreign keys of a table: which \
                columns reference which tables."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Table whose foreign keys to look up"
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "get_foreign_keys"))]
    async fn execute(&self, arguments: Value) -> Result<Value> {
        let args: GetForeignKeysArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        self.ctx
            .validator
            .check_identifier(&args.table_name)
            .map_err(Error::Security)?;

        let _permit = self.ctx.acquire()?;
        let keys = self
            .ctx
            .timed(self.ctx.driver.foreign_keys(Some(&args.table_name)))
            .await?;
        Ok(json!({
            "table": args.table_name,
            "foreign_keys": keys,
        }))
    }
}

pub struct GetTableRelationshipsTool {
    ctx: Arc<ToolContext>,
}

impl GetTableRelationshipsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ToolHandler for GetTableRelationshipsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_table_relationships".into(),
            description: "Get every foreign key relationship in the schema, \
                showing how tables connect to each other."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "get_table_relationships"))]
    async fn execute(&self, _arguments: Value) -> Result<Value> {
        let _permit = self.ctx.acquire()?;
        let keys = self.ctx.timed(self.ctx.driver.foreign_keys(None)).await?;
        let count = keys.len();
        Ok(json!({
            "relationships": keys,
            "count": count,
        }))
    }
}
