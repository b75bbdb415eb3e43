//! Error types for the SQL web console.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the server.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Query timeout after {0}ms")]
    Timeout(u64),

    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Security-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Destructive statement blocked: {0}")]
    DestructiveStatement(String),

    #[error("Query not allowed: {0}")]
    QueryNotAllowed(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Concurrent query limit exceeded: {0}")]
    ConcurrentLimitExceeded(u32),

    #[error("Query too complex: {0}")]
    QueryTooComplex(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Tool execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Language-model API errors.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited by upstream API")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("AI features disabled: GEMINI_API_KEY is not configured")]
    Disabled,
}

/// Result type alias for Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for SecurityError.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

/// Result type alias for AiError.
pub type AiResult<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let db_error = DatabaseError::ConnectionFailed("test".into());
        let error: Error = db_error.into();
        assert!(matches!(error, Error::Database(_)));

        let ai_error = AiError::Disabled;
        let error: Error = ai_error.into();
        assert!(matches!(error, Error::Ai(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SecurityError::DestructiveStatement("drop database".into());
        assert!(err.to_string().contains("drop database"));

        let err = DatabaseError::Timeout(30000);
        assert!(err.to_string().contains("30000"));
    }
}
