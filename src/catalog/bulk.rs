//! Describe every table of a database with bounded fan-out

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use super::descriptor::TableDescriptor;
use super::reader::CatalogReader;
use crate::error::{ErrorCategory, Result};

/// A table that could not be described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub category: ErrorCategory,
    pub error: String,
}

/// Outcome of describing every table: successes and per-table failures.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    pub tables: Vec<TableDescriptor>,
    pub failures: Vec<TableFailure>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Describe all user tables, at most `workers` at a time.
///
/// Only a failure to list the tables fails the call. A table that cannot be
/// described is recorded in [`SchemaReport::failures`] and the remaining
/// tables are still described. Results keep catalog order.
pub async fn describe_all(reader: &CatalogReader, workers: usize) -> Result<SchemaReport> {
    let names = reader.list_tables().await?;
    info!(
        target = %reader.target().display(),
        tables = names.len(),
        workers,
        "Describing tables"
    );

    let results: Vec<_> = stream::iter(names)
        .map(|name| async move {
            let outcome = reader.describe_table(&name).await;
            (name, outcome)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut report = SchemaReport::default();
    for (name, outcome) in results {
        match outcome {
            Ok(table) => report.tables.push(table),
            Err(e) => {
                warn!(table = %name, error = %e, "Failed to describe table");
                report.failures.push(TableFailure {
                    table: name,
                    category: e.category(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sql;
    use crate::executor::SqlParam;
    use crate::testing::{column_row, table_row, ScriptedExecutor};
    use std::sync::Arc;
    use std::time::Duration;

    fn ten_tables() -> ScriptedExecutor {
        let names: Vec<String> = (1..=10).map(|i| format!("T{:02}", i)).collect();
        let mut exec = ScriptedExecutor::new().respond(
            sql::LIST_TABLES,
            names.iter().map(|n| table_row(n)).collect(),
        );
        for (i, name) in names.iter().enumerate() {
            if i == 3 {
                exec = exec.fail_with_params(
                    sql::COLUMNS,
                    vec![SqlParam::from(name.as_str())],
                    "column lookup failed",
                );
            } else {
                exec = exec.with_table(name, vec![column_row("ID", 8, None, 4, false, None, 0)]);
            }
        }
        exec
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort() {
        let reader = CatalogReader::new(Arc::new(ten_tables()), "Db/BIG.fdb");
        let report = describe_all(&reader, 4).await.unwrap();

        assert_eq!(report.tables.len(), 9);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_complete());

        let failure = &report.failures[0];
        assert_eq!(failure.table, "T04");
        assert_eq!(failure.category, ErrorCategory::EngineFailure);
        assert!(failure.error.contains("column lookup failed"));

        let names: Vec<&str> = report.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names[0], "T01");
        assert_eq!(names[3], "T05");
    }

    #[tokio::test]
    async fn test_listing_failure_fails_call() {
        let exec = ScriptedExecutor::new().fail(sql::LIST_TABLES, "attach lost");
        let reader = CatalogReader::new(Arc::new(exec), "Db/X.fdb");
        assert!(describe_all(&reader, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let exec = Arc::new(ten_tables().with_delay(Duration::from_millis(5)));
        let reader = CatalogReader::new(exec.clone(), "Db/BIG.fdb");
        describe_all(&reader, 2).await.unwrap();
        // sequential key lookups, so one statement per worker at most
        assert!(exec.max_in_flight() <= 2);
    }
}
