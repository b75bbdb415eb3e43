//! SQL statement validation.
//!
//! Centralizes the safety policy that every query-accepting path (the direct
//! `/run` endpoint and each AI tool) calls through: a destructive-phrase
//! denylist, a read-only prefix gate for tool queries, and identifier
//! validation for names that get interpolated into introspection SQL.
//!
//! The denylist is a lexical substring check, not a parser. It is trivially
//! bypassable with comments or creative whitespace and is documented as a
//! guard rail against accidents, not a security boundary.

use crate::error::{SecurityError, SecurityResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Destructive phrases blocked everywhere, including the direct endpoint.
const DENYLISTED_PHRASES: &[&str] = &["drop database", "truncate database"];

/// Leading verbs that classify a statement as read-only.
const READ_PREFIXES: &[&str] = &["select", "show", "describe", "desc", "explain", "with"];

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid regex: identifier pattern"));

static LIMIT_CLAUSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+\d+").expect("Invalid regex: limit clause pattern"));

static COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--|/\*|\*/|#").expect("Invalid regex: comment marker pattern"));

/// Statement classification by leading verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows: SELECT, SHOW, DESCRIBE, EXPLAIN, WITH.
    Read,
    /// Everything else: executed and committed, returns an affected-row count.
    Write,
}

/// SQL statement validator.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    max_query_length: usize,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self {
            max_query_length: 10000,
        }
    }
}

impl SqlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_query_length(mut self, length: usize) -> Self {
        self.max_query_length = length;
        self
    }

    /// Classify a statement by its leading verb, ignoring leading whitespace.
    pub fn classify(&self, statement: &str) -> StatementKind {
        let lower = statement.trim_start().to_lowercase();
        if READ_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            StatementKind::Read
        } else {
            StatementKind::Write
        }
    }

    /// Reject empty statements, over-long statements, and denylisted
    /// destructive phrases. Applied to every statement before execution.
    pub fn check(&self, statement: &str) -> SecurityResult<()> {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            return Err(SecurityError::QueryNotAllowed("Empty query".into()));
        }
        if statement.len() > self.max_query_length {
            return Err(SecurityError::QueryTooComplex(format!(
                "Query exceeds maximum length of {} characters",
                self.max_query_length
            )));
        }

        let lower = statement.to_lowercase();
        for phrase in DENYLISTED_PHRASES {
            if lower.contains(phrase) {
                warn!("Denylisted phrase detected: {}", phrase);
                return Err(SecurityError::DestructiveStatement((*phrase).into()));
            }
        }

        debug!("Statement passed denylist check");
        Ok(())
    }

    /// Require a read-only statement. Used by every AI tool that accepts SQL.
    pub fn check_read_only(&self, statement: &str) -> SecurityResult<()> {
        self.check(statement)?;
        if self.classify(statement) != StatementKind::Read {
            return Err(SecurityError::QueryNotAllowed(
                "Only SELECT, SHOW, DESCRIBE, EXPLAIN, and WITH queries are allowed".into(),
            ));
        }
        Ok(())
    }

    /// Validate a table or column name before it is interpolated into SQL.
    pub fn check_identifier(&self, name: &str) -> SecurityResult<()> {
        if IDENTIFIER_REGEX.is_match(name) {
            Ok(())
        } else {
            Err(SecurityError::InvalidIdentifier(name.to_string()))
        }
    }

    /// Validate a caller-supplied WHERE fragment: no statement separators,
    /// no comment markers, no denylisted phrases.
    pub fn check_filter_clause(&self, clause: &str) -> SecurityResult<()> {
        if clause.contains(';') {
            return Err(SecurityError::QueryNotAllowed(
                "Filter clause must be a single expression".into(),
            ));
        }
        if COMMENT_REGEX.is_match(clause) {
            return Err(SecurityError::QueryNotAllowed(
                "Comment markers are not allowed in filter clauses".into(),
            ));
        }
        self.check(clause)
    }

    /// Append a row cap to a SELECT that does not already carry one.
    pub fn enforce_row_limit(&self, query: &str, cap: u32) -> String {
        if LIMIT_CLAUSE_REGEX.is_match(query) {
            return query.trim().trim_end_matches(';').to_string();
        }
        format!("{} LIMIT {}", query.trim().trim_end_matches(';'), cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_read_statements() {
        let validator = SqlValidator::new();
        assert_eq!(validator.classify("SELECT * FROM users"), StatementKind::Read);
        assert_eq!(validator.classify("  show tables"), StatementKind::Read);
        assert_eq!(validator.classify("DESCRIBE users"), StatementKind::Read);
        assert_eq!(
            validator.classify("WITH cte AS (SELECT 1) SELECT * FROM cte"),
            StatementKind::Read
        );
    }

    #[test]
    fn test_classify_write_statements() {
        let validator = SqlValidator::new();
        assert_eq!(
            validator.classify("INSERT INTO users VALUES (1)"),
            StatementKind::Write
        );
        assert_eq!(
            validator.classify("UPDATE users SET name = 'x'"),
            StatementKind::Write
        );
        assert_eq!(validator.classify("DELETE FROM users"), StatementKind::Write);
    }

    #[test]
    fn test_denylist_blocks_destructive_phrases() {
        let validator = SqlValidator::new();
        assert!(validator.check("DROP DATABASE shop").is_err());
        assert!(validator.check("drop   database shop").is_ok()); // lexical check only
        assert!(validator.check("TRUNCATE DATABASE shop").is_err());
        assert!(validator.check("Drop Database shop").is_err());
    }

    #[test]
    fn test_denylist_allows_normal_writes() {
        let validator = SqlValidator::new();
        assert!(validator.check("DROP TABLE scratch").is_ok());
        assert!(validator.check("INSERT INTO users VALUES (1)").is_ok());
    }

    #[test]
    fn test_empty_query_rejected() {
        let validator = SqlValidator::new();
        assert!(validator.check("").is_err());
        assert!(validator.check("   ").is_err());
    }

    #[test]
    fn test_read_only_gate() {
        let validator = SqlValidator::new();
        assert!(validator.check_read_only("SELECT 1").is_ok());
        assert!(validator.check_read_only("SHOW TABLES").is_ok());
        assert!(validator.check_read_only("DELETE FROM users").is_err());
        assert!(validator
            .check_read_only("INSERT INTO users VALUES (1)")
            .is_err());
    }

    #[test]
    fn test_identifier_validation() {
        let validator = SqlValidator::new();
        assert!(validator.check_identifier("users").is_ok());
        assert!(validator.check_identifier("order_items2").is_ok());
        assert!(validator.check_identifier("users; DROP TABLE x").is_err());
        assert!(validator.check_identifier("users`").is_err());
        assert!(validator.check_identifier("").is_err());
    }

    #[test]
    fn test_filter_clause_validation() {
        let validator = SqlValidator::new();
        assert!(validator.check_filter_clause("price > 10").is_ok());
        assert!(validator.check_filter_clause("id = 1; DELETE FROM t").is_err());
        assert!(validator.check_filter_clause("1=1 -- x").is_err());
    }

    #[test]
    fn test_enforce_row_limit() {
        let validator = SqlValidator::new();
        assert_eq!(
            validator.enforce_row_limit("SELECT * FROM users", 100),
            "SELECT * FROM users LIMIT 100"
        );
        assert_eq!(
            validator.enforce_row_limit("SELECT * FROM users LIMIT 5;", 100),
            "SELECT * FROM users LIMIT 5"
        );
        assert_eq!(
            validator.enforce_row_limit("SELECT * FROM users limit 7", 100),
            "SELECT * FROM users limit 7"
        );
    }

    #[test]
    fn test_query_length() {
        let validator = SqlValidator::new().max_query_length(20);
        assert!(validator.check("SELECT * FROM a_very_long_table_name").is_err());
    }
}
