//! MySQL driver using `sqlx`.

use crate::config::DatabaseConfig;
use crate::database::result::*;
use crate::error::{DatabaseError, DbResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as _, Row as _, TypeInfo as _};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument};

/// MySQL database driver over a connection pool.
pub struct MySqlDriver {
    pool: MySqlPool,
    config: DatabaseConfig,
}

impl MySqlDriver {
    /// Create a new driver and verify connectivity.
    pub async fn connect(config: DatabaseConfig) -> DbResult<Self> {
        info!(
            "Connecting to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.connection_timeout)
            .connect(&config.url())
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "MySQL connection pool created with max size {}",
            config.pool_size
        );

        Ok(Self { pool, config })
    }

    pub fn database_name(&self) -> &str {
        &self.config.database
    }

    pub async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Convert a MySQL row to our Row type.
    fn convert_row(mysql_row: &MySqlRow) -> Row {
        let mut row = HashMap::new();
        for (i, col) in mysql_row.columns().iter().enumerate() {
            let value = Self::get_cell_value(mysql_row, i, col.type_info().name());
            row.insert(col.name().to_string(), value);
        }
        row
    }

    /// Extract a cell value, dispatching on the column's reported type.
    fn get_cell_value(row: &MySqlRow, index: usize, data_type: &str) -> CellValue {
        match data_type {
            "BOOLEAN" => {
                if let Ok(Some(val)) = row.try_get::<Option<bool>, _>(index) {
                    return CellValue::Bool(val);
                }
            }
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                if let Ok(Some(val)) = row.try_get::<Option<i64>, _>(index) {
                    return CellValue::Int(val);
                }
            }
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => {
                if let Ok(Some(val)) = row.try_get::<Option<u64>, _>(index) {
                    return CellValue::UInt(val);
                }
            }
            "FLOAT" => {
                if let Ok(Some(val)) = row.try_get::<Option<f32>, _>(index) {
                    return CellValue::Float(val as f64);
                }
            }
            "DOUBLE" => {
                if let Ok(Some(val)) = row.try_get::<Option<f64>, _>(index) {
                    return CellValue::Float(val);
                }
            }
            "DECIMAL" => {
                if let Ok(Some(val)) = row.try_get::<Option<Decimal>, _>(index) {
                    return CellValue::Decimal(val);
                }
            }
            "DATE" => {
                if let Ok(Some(val)) = row.try_get::<Option<NaiveDate>, _>(index) {
                    return CellValue::Date(val);
                }
            }
            "DATETIME" => {
                if let Ok(Some(val)) = row.try_get::<Option<NaiveDateTime>, _>(index) {
                    return CellValue::DateTime(DateTime::from_naive_utc_and_offset(val, Utc));
                }
            }
            "TIMESTAMP" => {
                if let Ok(Some(val)) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
                    return CellValue::DateTime(val);
                }
            }
            "TIME" => {
                if let Ok(Some(val)) = row.try_get::<Option<NaiveTime>, _>(index) {
                    return CellValue::String(val.format("%H:%M:%S").to_string());
                }
            }
            "JSON" => {
                if let Ok(Some(val)) = row.try_get::<Option<serde_json::Value>, _>(index) {
                    return CellValue::Json(val);
                }
            }
            "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                if let Ok(Some(val)) = row.try_get::<Option<Vec<u8>>, _>(index) {
                    return CellValue::Bytes(val);
                }
            }
            _ => {}
        }

        // Fallback: string, then raw bytes.
        if let Ok(Some(val)) = row.try_get::<Option<String>, _>(index) {
            return CellValue::String(val);
        }
        if let Ok(Some(val)) = row.try_get::<Option<Vec<u8>>, _>(index) {
            return CellValue::Bytes(val);
        }

        CellValue::Null
    }

    fn build_result(rows: Vec<MySqlRow>, elapsed_ms: u64) -> QueryResult {
        if rows.is_empty() {
            let mut result = QueryResult::empty();
            result.execution_time_ms = elapsed_ms;
            return result;
        }

        let columns: Vec<Column> = rows[0]
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.type_info().name()))
            .collect();

        let converted: Vec<Row> = rows.iter().map(Self::convert_row).collect();
        QueryResult::new(columns, converted, elapsed_ms)
    }

    /// Execute a read statement and return rows.
    #[instrument(skip(self, query), fields(db = "mysql"))]
    pub async fn run_query(&self, query: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        debug!("Executing query: {}", truncate_for_log(query, 200));

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        Ok(Self::build_result(rows, elapsed))
    }

    /// Execute a read statement with a timeout.
    pub async fn run_query_with_timeout(
        &self,
        query: &str,
        query_timeout: Duration,
    ) -> DbResult<QueryResult> {
        timeout(query_timeout, self.run_query(query))
            .await
            .map_err(|_| DatabaseError::Timeout(query_timeout.as_millis() as u64))?
    }

    /// Execute a write statement with a timeout.
    pub async fn run_statement_with_timeout(
        &self,
        statement: &str,
        query_timeout: Duration,
    ) -> DbResult<u64> {
        timeout(query_timeout, self.run_statement(statement))
            .await
            .map_err(|_| DatabaseError::Timeout(query_timeout.as_millis() as u64))?
    }

    /// Execute a write statement and return the affected-row count.
    ///
    /// The pool runs in autocommit mode, so the statement is committed as
    /// soon as it completes. There are no explicit transaction boundaries.
    #[instrument(skip(self, statement), fields(db = "mysql"))]
    pub async fn run_statement(&self, statement: &str) -> DbResult<u64> {
        debug!("Executing statement: {}", truncate_for_log(statement, 200));

        let result = sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// List table names in the configured database.
    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> DbResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = DATABASE() \
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let tables = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("table_name").ok())
            .collect();

        Ok(tables)
    }

    /// Describe a table's columns from `information_schema`.
    #[instrument(skip(self))]
    pub async fn describe_table(&self, table_name: &str) -> DbResult<Vec<ColumnSchema>> {
        let rows = sqlx::query(
            "SELECT column_name AS name, column_type AS data_type, \
                    is_nullable AS nullable, column_key AS column_key, \
                    column_default AS default_value, extra AS extra \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows.is_empty() {
            return Err(DatabaseError::TableNotFound(table_name.to_string()));
        }

        let columns = rows
            .iter()
            .map(|row| ColumnSchema {
                name: row.try_get::<String, _>("name").unwrap_or_default(),
                data_type: row.try_get::<String, _>("data_type").unwrap_or_default(),
                nullable: row
                    .try_get::<String, _>("nullable")
                    .map(|v| v == "YES")
                    .unwrap_or(true),
                key: row
                    .try_get::<Option<String>, _>("column_key")
                    .ok()
                    .flatten()
                    .filter(|k| !k.is_empty()),
                default_value: row
                    .try_get::<Option<String>, _>("default_value")
                    .ok()
                    .flatten(),
                extra: row
                    .try_get::<Option<String>, _>("extra")
                    .ok()
                    .flatten()
                    .filter(|e| !e.is_empty()),
            })
            .collect();

        Ok(columns)
    }

    /// Foreign key edges, optionally filtered to one table's outgoing keys.
    #[instrument(skip(self))]
    pub async fn foreign_keys(&self, table_name: Option<&str>) -> DbResult<Vec<ForeignKey>> {
        let base = "SELECT constraint_name AS constraint_name, \
                           table_name AS from_table, column_name AS from_column, \
                           referenced_table_name AS to_table, \
                           referenced_column_name AS to_column \
                    FROM information_schema.key_column_usage \
                    WHERE table_schema = DATABASE() \
                      AND referenced_table_name IS NOT NULL";

        let rows = match table_name {
            Some(table) => {
                let sql = format!("{base} AND table_name = ? ORDER BY constraint_name");
                sqlx::query(&sql).bind(table).fetch_all(&self.pool).await
            }
            None => {
                let sql = format!("{base} ORDER BY from_table, constraint_name");
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let keys = rows
            .iter()
            .map(|row| ForeignKey {
                constraint_name: row
                    .try_get::<String, _>("constraint_name")
                    .unwrap_or_default(),
                from_table: row.try_get::<String, _>("from_table").unwrap_or_default(),
                from_column: row.try_get::<String, _>("from_column").unwrap_or_default(),
                to_table: row.try_get::<String, _>("to_table").unwrap_or_default(),
                to_column: row.try_get::<String, _>("to_column").unwrap_or_default(),
            })
            .collect();

        Ok(keys)
    }

    /// Count rows in a table, with an optional pre-validated filter clause.
    #[instrument(skip(self, where_clause))]
    pub async fn count_records(
        &self,
        table_name: &str,
        where_clause: Option<&str>,
    ) -> DbResult<i64> {
        let sql = match where_clause {
            Some(clause) => format!("SELECT COUNT(*) AS cnt FROM `{table_name}` WHERE {clause}"),
            None => format!("SELECT COUNT(*) AS cnt FROM `{table_name}`"),
        };

        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        // COUNT(*) is reported as signed or unsigned BIGINT depending on
        // the server version.
        if let Ok(count) = row.try_get::<i64, _>("cnt") {
            return Ok(count);
        }
        row.try_get::<u64, _>("cnt")
            .map(|count| count as i64)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Substring search via a parameterized LIKE. The table and column names
    /// must already be identifier-validated by the caller; the search value
    /// itself is bound, never interpolated.
    #[instrument(skip(self, search_value))]
    pub async fn search_records(
        &self,
        table_name: &str,
        column: &str,
        search_value: &str,
        limit: u32,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let sql =
            format!("SELECT * FROM `{table_name}` WHERE `{column}` LIKE ? LIMIT {limit}");

        let rows = sqlx::query(&sql)
            .bind(format!("%{search_value}%"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let elapsed = start.elapsed().as_millis() as u64;
        Ok(Self::build_result(rows, elapsed))
    }
}

/// Truncate a statement for logging without splitting a multibyte
/// character.
fn truncate_for_log(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
