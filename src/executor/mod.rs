//! Statement execution against database files
//!
//! [`QueryExecutor`] is the seam between the catalog/query layers and the
//! engine driver. Each call targets one database file, runs exactly one
//! statement, and fully materializes the result; implementations never hold
//! an attachment open across calls.
//!
//! - [`FirebirdExecutor`] (feature `firebird`) talks to a Firebird server over
//!   the wire protocol.
//! - [`UnavailableExecutor`] is used when the crate is built without a driver;
//!   every call fails as a connection error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{FbscopeError, Result};
use crate::value::Row;

#[cfg(feature = "firebird")]
mod firebird;
mod unavailable;

#[cfg(feature = "firebird")]
pub use firebird::{FirebirdExecutor, FirebirdOptions};
pub use unavailable::UnavailableExecutor;

/// Longest statement prefix written to debug logs.
const LOGGED_STATEMENT_CHARS: usize = 120;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl SqlParam {
    /// Convert a JSON value from an ad hoc query body.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(SqlParam::Null),
            Value::Bool(b) => Ok(SqlParam::Integer(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(SqlParam::Integer(i)),
                None => n.as_f64().map(SqlParam::Float).ok_or_else(|| {
                    FbscopeError::invalid_request(format!("unsupported numeric parameter {}", n))
                }),
            },
            Value::String(s) => Ok(SqlParam::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(FbscopeError::invalid_request(
                "query parameters must be scalars",
            )),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        SqlParam::Integer(n)
    }
}

/// Runs one read-only statement against one database file.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Attach to `target`, run `sql` with `params`, detach, and return rows.
    ///
    /// Attach failures are reported as [`FbscopeError::Connection`], failures
    /// after a successful attach as [`FbscopeError::Statement`].
    async fn execute(&self, target: &Path, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>>;

    /// Whether independent statements may be in flight at the same time.
    fn supports_concurrent_statements(&self) -> bool {
        false
    }
}

/// Run a statement with an optional deadline.
///
/// A statement that exceeds the deadline is abandoned and reported as
/// [`FbscopeError::Timeout`]; it is never retried.
pub async fn execute_with_deadline(
    executor: &dyn QueryExecutor,
    target: &Path,
    sql: &str,
    params: &[SqlParam],
    deadline: Option<Duration>,
) -> Result<Vec<Row>> {
    debug!(
        target = %target.display(),
        params = params.len(),
        sql = %truncate_statement(sql),
        "Executing statement"
    );
    match deadline {
        Some(limit) => tokio::time::timeout(limit, executor.execute(target, sql, params))
            .await
            .map_err(|_| FbscopeError::Timeout(limit.as_millis() as u64))?,
        None => executor.execute(target, sql, params).await,
    }
}

/// Shared executor handle.
pub type SharedExecutor = Arc<dyn QueryExecutor>;

fn truncate_statement(sql: &str) -> String {
    let flat: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = flat
        .char_indices()
        .nth(LOGGED_STATEMENT_CHARS)
        .map(|(idx, _)| idx);
    match cut {
        Some(idx) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
