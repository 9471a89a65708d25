//! Testing utilities for fbscope
//!
//! [`ScriptedExecutor`] is an in-process [`QueryExecutor`] that answers
//! statements from a script instead of a database server, and records every
//! statement it was asked to run. It backs the unit tests of the catalog and
//! query layers as well as the HTTP integration tests.
//!
//! # Matching
//!
//! A rule matches when its fragment is a substring of the statement text.
//! Attach failures for a target are checked first. Rules pinned to a
//! parameter list only match that exact list and are preferred over unpinned
//! rules; otherwise the first registered match wins.
//! A statement that matches no rule returns zero rows.
//!
//! # Example
//!
//! ```
//! use fbscope::testing::{column_row, ScriptedExecutor};
//!
//! let executor = ScriptedExecutor::new()
//!     .with_table("PATIENT", vec![column_row("PCODE", 8, None, 4, true, None, 0)])
//!     .respond("COUNT(*) AS TOTAL", vec![]);
//! assert!(executor.calls().is_empty());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::catalog::{sql, VerifiedTable};
use crate::error::{FbscopeError, Result};
use crate::executor::{QueryExecutor, SqlParam};
use crate::value::{RawValue, Row};

// ── Script ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Outcome {
    Rows(Vec<Row>),
    Connection(String),
    Statement(String),
}

#[derive(Debug, Clone)]
struct Rule {
    fragment: String,
    target: Option<String>,
    params: Option<Vec<SqlParam>>,
    outcome: Outcome,
}

impl Rule {
    fn matches(&self, target: &Path, sql: &str) -> bool {
        let target_ok = self
            .target
            .as_ref()
            .map_or(true, |t| target.to_string_lossy().contains(t.as_str()));
        target_ok && sql.contains(self.fragment.as_str())
    }
}

/// A statement the executor was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub target: PathBuf,
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Scripted stand-in for a database engine.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<ExecutedStatement>>,
    delay: Option<Duration>,
    concurrent: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Answer statements containing `fragment` with `rows`.
    pub fn respond(self, fragment: &str, rows: Vec<Row>) -> Self {
        self.push(Rule {
            fragment: fragment.to_string(),
            target: None,
            params: None,
            outcome: Outcome::Rows(rows),
        })
    }

    /// Answer statements containing `fragment` bound with exactly `params`.
    pub fn respond_with_params(self, fragment: &str, params: Vec<SqlParam>, rows: Vec<Row>) -> Self {
        self.push(Rule {
            fragment: fragment.to_string(),
            target: None,
            params: Some(params),
            outcome: Outcome::Rows(rows),
        })
    }

    /// Fail statements containing `fragment` as a statement error.
    pub fn fail(self, fragment: &str, message: &str) -> Self {
        self.push(Rule {
            fragment: fragment.to_string(),
            target: None,
            params: None,
            outcome: Outcome::Statement(message.to_string()),
        })
    }

    /// Fail statements containing `fragment` bound with exactly `params`.
    pub fn fail_with_params(self, fragment: &str, params: Vec<SqlParam>, message: &str) -> Self {
        self.push(Rule {
            fragment: fragment.to_string(),
            target: None,
            params: Some(params),
            outcome: Outcome::Statement(message.to_string()),
        })
    }

    /// Refuse to attach any database whose path contains `target_fragment`.
    pub fn fail_attach(self, target_fragment: &str, message: &str) -> Self {
        self.push(Rule {
            fragment: String::new(),
            target: Some(target_fragment.to_string()),
            params: None,
            outcome: Outcome::Connection(message.to_string()),
        })
    }

    /// Register a user table: its existence check, columns and column names.
    pub fn with_table(self, name: &str, columns: Vec<Row>) -> Self {
        let names: Vec<Row> = columns
            .iter()
            .map(|c| {
                Row::new().with(
                    "RDB$FIELD_NAME",
                    c.get("RDB$FIELD_NAME").cloned().unwrap_or(RawValue::Null),
                )
            })
            .collect();
        let param = vec![SqlParam::from(name)];
        self.respond_with_params(
            sql::TABLE_EXISTS,
            param.clone(),
            vec![Row::new().with(sql::column::COUNT, 1i64)],
        )
        .respond_with_params(sql::COLUMNS, param.clone(), columns)
        .respond_with_params(sql::COLUMN_NAMES, param, names)
    }

    /// Delay every response, for deadline and concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report support for concurrent statements.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Every statement executed so far, in order.
    pub fn calls(&self) -> Vec<ExecutedStatement> {
        self.calls.lock().clone()
    }

    /// Statement texts executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.sql.clone()).collect()
    }

    /// Highest number of statements observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, target: &Path, sql: &str, params: &[SqlParam]) -> Outcome {
        let attach = self
            .rules
            .iter()
            .find(|r| r.target.is_some() && r.matches(target, sql));
        let pinned = || {
            self.rules
                .iter()
                .find(|r| r.params.as_deref() == Some(params) && r.matches(target, sql))
        };
        let rule = attach.or_else(pinned).or_else(|| {
            self.rules
                .iter()
                .find(|r| r.params.is_none() && r.matches(target, sql))
        });
        rule.map(|r| r.outcome.clone())
            .unwrap_or(Outcome::Rows(Vec::new()))
    }
}

#[async_trait::async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, target: &Path, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        self.calls.lock().push(ExecutedStatement {
            target: target.to_path_buf(),
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.lookup(target, sql, params) {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Connection(msg) => Err(FbscopeError::Connection(msg)),
            Outcome::Statement(msg) => Err(FbscopeError::Statement(msg)),
        }
    }

    fn supports_concurrent_statements(&self) -> bool {
        self.concurrent
    }
}

// ── Catalog fixtures ────────────────────────────────────────────────────────

/// Pad a catalog name the way the engine returns `CHAR(31)` columns.
pub fn padded(name: &str) -> RawValue {
    RawValue::Bytes(format!("{:<31}", name).into_bytes())
}

/// A row of the table-listing statement.
pub fn table_row(name: &str) -> Row {
    Row::new().with(sql::column::TABLE_NAME, padded(name))
}

/// A row of the column metadata statement.
pub fn column_row(
    name: &str,
    type_code: i32,
    sub_type: Option<i32>,
    length: i32,
    nullable: bool,
    default_source: Option<&str>,
    position: i64,
) -> Row {
    Row::new()
        .with("RDB$FIELD_NAME", padded(name))
        .with("RDB$FIELD_TYPE", i64::from(type_code))
        .with("RDB$FIELD_SUB_TYPE", sub_type.map(i64::from))
        .with("RDB$FIELD_LENGTH", i64::from(length))
        .with("RDB$NULL_FLAG", if nullable { None } else { Some(1i64) })
        .with("RDB$DEFAULT_SOURCE", default_source)
        .with("RDB$FIELD_POSITION", position)
}

/// A row of the primary-key statement.
pub fn key_row(column: &str) -> Row {
    Row::new().with("RDB$FIELD_NAME", padded(column))
}

/// A row of the foreign-key statement.
pub fn foreign_key_row(
    constraint: &str,
    column: &str,
    position: i64,
    referenced_table: &str,
    referenced_column: &str,
    referenced_position: i64,
) -> Row {
    Row::new()
        .with("RDB$CONSTRAINT_NAME", padded(constraint))
        .with("RDB$FIELD_NAME", padded(column))
        .with(sql::column::FIELD_POSITION, position)
        .with(sql::column::REFERENCED_TABLE, padded(referenced_table))
        .with(sql::column::REFERENCED_FIELD, padded(referenced_column))
        .with(sql::column::REFERENCED_POSITION, referenced_position)
}

/// A verified table name without a catalog round trip, for statement
/// builder tests.
pub fn verified_table(name: &str) -> VerifiedTable {
    VerifiedTable::new(name)
}

/// A row of the index statement.
pub fn index_row(index: &str, unique: bool, column: &str) -> Row {
    Row::new()
        .with("RDB$INDEX_NAME", padded(index))
        .with("RDB$UNIQUE_FLAG", if unique { Some(1i64) } else { None })
        .with("RDB$FIELD_NAME", padded(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pinned_rule_wins_over_generic() {
        let exec = ScriptedExecutor::new()
            .respond("FROM T", vec![Row::new().with("N", 1i64)])
            .respond_with_params("FROM T", vec![SqlParam::Integer(2)], vec![Row::new().with("N", 2i64)]);
        let path = Path::new("a.fdb");

        let generic = exec.execute(path, "SELECT N FROM T", &[]).await.unwrap();
        assert_eq!(generic[0].integer("N"), Some(1));

        let pinned = exec
            .execute(path, "SELECT N FROM T", &[SqlParam::Integer(2)])
            .await
            .unwrap();
        assert_eq!(pinned[0].integer("N"), Some(2));
        assert_eq!(exec.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_returns_no_rows() {
        let exec = ScriptedExecutor::new();
        let rows = exec.execute(Path::new("a.fdb"), "SELECT 1", &[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_attach_failure_by_target() {
        let exec = ScriptedExecutor::new().fail_attach("BROKEN", "refused");
        let err = exec
            .execute(Path::new("Db/BROKEN.fdb"), sql::LIST_TABLES, &[])
            .await
            .unwrap_err();
        assert!(err.is_connection_failure());
        assert!(exec
            .execute(Path::new("Db/OK.fdb"), sql::LIST_TABLES, &[])
            .await
            .is_ok());
    }

    #[test]
    fn test_padded_names_trim_back() {
        let row = table_row("PATIENT");
        assert_eq!(row.text("TABLE_NAME"), Some("PATIENT".to_string()));
    }
}
