//! Error types for fbscope
//!
//! This module defines the crate-wide error type and maps every failure onto a
//! small set of stable categories that the HTTP layer turns into status codes.
//!
//! ## Categories
//!
//! - `NOT_FOUND`: unknown logical database or table name. Detected before any
//!   generated statement references the name.
//! - `INVALID_REQUEST`: malformed caller input (missing query text, zero search
//!   filters, a non-SELECT ad hoc statement, unparsable paging values).
//! - `ENGINE_FAILURE`: attach failures, statement failures, catalog failures
//!   for a specific table, and statement timeouts.
//! - `INTERNAL`: configuration and local IO faults.
//!
//! Charset decoding that exhausts every candidate encoding is not an error:
//! the normalizer falls back to lossy UTF-8 and records the event instead.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for fbscope operations
pub type Result<T> = std::result::Result<T, FbscopeError>;

/// Stable, language-independent error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Unknown database or table
    NotFound,
    /// Malformed caller input
    InvalidRequest,
    /// The engine could not be reached or rejected a statement
    EngineFailure,
    /// Local configuration or IO fault
    Internal,
}

impl ErrorCategory {
    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::InvalidRequest => "INVALID_REQUEST",
            ErrorCategory::EngineFailure => "ENGINE_FAILURE",
            ErrorCategory::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum FbscopeError {
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The database file could not be attached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement was rejected or failed during execution.
    #[error("Statement error: {0}")]
    Statement(String),

    /// A catalog query failed while describing a specific table.
    #[error("Catalog error for table '{table}': {detail}")]
    Catalog { table: String, detail: String },

    #[error("Statement timed out after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FbscopeError {
    /// Create an invalid request error
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        FbscopeError::InvalidRequest(detail.into())
    }

    /// Create a catalog error tagged with the table it was raised for.
    ///
    /// Catalog errors wrapping another catalog error keep the innermost detail
    /// so the table name is not repeated.
    pub fn catalog(table: &str, source: FbscopeError) -> Self {
        let detail = match source {
            FbscopeError::Catalog { detail, .. } => detail,
            other => other.to_string(),
        };
        FbscopeError::Catalog {
            table: table.to_string(),
            detail,
        }
    }

    /// Create a configuration error for a specific setting
    pub fn config(setting: &str, reason: impl Into<String>) -> Self {
        FbscopeError::Config(format!("{}: {}", setting, reason.into()))
    }

    /// Map this error onto its stable category
    pub fn category(&self) -> ErrorCategory {
        match self {
            FbscopeError::DatabaseNotFound(_) | FbscopeError::TableNotFound(_) => {
                ErrorCategory::NotFound
            }
            FbscopeError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            FbscopeError::Connection(_)
            | FbscopeError::Statement(_)
            | FbscopeError::Catalog { .. }
            | FbscopeError::Timeout(_) => ErrorCategory::EngineFailure,
            FbscopeError::Config(_)
            | FbscopeError::Io(_)
            | FbscopeError::Serialization(_)
            | FbscopeError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns true if the engine could not be reached at all
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, FbscopeError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            FbscopeError::TableNotFound("GHOST".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            FbscopeError::invalid_request("no filters").category(),
            ErrorCategory::InvalidRequest
        );
        assert_eq!(
            FbscopeError::Timeout(500).category(),
            ErrorCategory::EngineFailure
        );
        assert_eq!(
            FbscopeError::config("charsets", "unknown label").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_catalog_error_names_table() {
        let err = FbscopeError::catalog("PATIENT", FbscopeError::Statement("boom".into()));
        assert_eq!(err.category(), ErrorCategory::EngineFailure);
        let msg = err.to_string();
        assert!(msg.contains("PATIENT"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_catalog_error_does_not_nest() {
        let inner = FbscopeError::catalog("A", FbscopeError::Statement("bad".into()));
        let outer = FbscopeError::catalog("A", inner);
        assert_eq!(
            outer.to_string(),
            "Catalog error for table 'A': Statement error: bad"
        );
    }

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&ErrorCategory::EngineFailure).unwrap();
        assert_eq!(json, "\"ENGINE_FAILURE\"");
        assert_eq!(ErrorCategory::NotFound.to_string(), "NOT_FOUND");
    }
}
