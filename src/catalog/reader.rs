//! Catalog reader: projects `RDB$` rows into descriptors

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::descriptor::{
    ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableDescriptor, VerifiedTable,
};
use super::sql;
use super::types::map_type;
use crate::charset::CharsetNormalizer;
use crate::error::{FbscopeError, Result};
use crate::executor::{execute_with_deadline, SharedExecutor, SqlParam};
use crate::value::{RawValue, Row};

/// Read-only view of one database file's catalog.
///
/// Holds no connection; every operation issues its own statements through
/// the executor.
#[derive(Clone)]
pub struct CatalogReader {
    executor: SharedExecutor,
    target: PathBuf,
    timeout: Option<Duration>,
    normalizer: Arc<CharsetNormalizer>,
}

impl CatalogReader {
    pub fn new(executor: SharedExecutor, target: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            target: target.into(),
            timeout: None,
            normalizer: Arc::new(CharsetNormalizer::default()),
        }
    }

    /// Decoder for catalog text that may hold national characters, such as
    /// column default sources.
    pub fn with_normalizer(mut self, normalizer: Arc<CharsetNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Per-statement deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    async fn run(&self, statement: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        execute_with_deadline(
            self.executor.as_ref(),
            &self.target,
            statement,
            params,
            self.timeout,
        )
        .await
    }

    /// User tables, ordered by name.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.run(sql::LIST_TABLES, &[]).await?;
        Ok(rows.iter().filter_map(|r| r.text(sql::column::TABLE_NAME)).collect())
    }

    /// Whether `name` is a user table of this database.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let rows = self.run(sql::TABLE_EXISTS, &[SqlParam::from(name)]).await?;
        let count = rows.first().and_then(|r| r.integer(sql::column::COUNT)).unwrap_or(0);
        Ok(count > 0)
    }

    /// Check `name` against the catalog, returning a handle that may be
    /// interpolated into statement text.
    pub async fn verify_table(&self, name: &str) -> Result<VerifiedTable> {
        if self.table_exists(name).await? {
            Ok(VerifiedTable::new(name.trim()))
        } else {
            debug!(table = %name, target = %self.target.display(), "Table not in catalog");
            Err(FbscopeError::TableNotFound(name.to_string()))
        }
    }

    /// Column names of a verified table, in position order.
    pub async fn column_names(&self, table: &VerifiedTable) -> Result<Vec<String>> {
        let rows = self
            .run(sql::COLUMN_NAMES, &[SqlParam::from(table.name())])
            .await
            .map_err(|e| FbscopeError::catalog(table.name(), e))?;
        Ok(rows.iter().filter_map(|r| r.text("RDB$FIELD_NAME")).collect())
    }

    /// Full descriptor of one table.
    ///
    /// Columns are read first; a relation without columns is reported as not
    /// found. The key and index lookups are independent and run concurrently
    /// when the executor allows it.
    pub async fn describe_table(&self, name: &str) -> Result<TableDescriptor> {
        let columns = self
            .columns(name)
            .await
            .map_err(|e| FbscopeError::catalog(name, e))?;
        if columns.is_empty() {
            return Err(FbscopeError::TableNotFound(name.to_string()));
        }

        let (primary_keys, foreign_keys, indexes) =
            if self.executor.supports_concurrent_statements() {
                tokio::try_join!(
                    self.primary_keys(name),
                    self.foreign_keys(name),
                    self.indexes(name)
                )
            } else {
                async {
                    Ok::<_, FbscopeError>((
                        self.primary_keys(name).await?,
                        self.foreign_keys(name).await?,
                        self.indexes(name).await?,
                    ))
                }
                .await
            }
            .map_err(|e| FbscopeError::catalog(name, e))?;

        Ok(TableDescriptor::assemble(
            name,
            columns,
            primary_keys,
            foreign_keys,
            indexes,
        ))
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let rows = self.run(sql::COLUMNS, &[SqlParam::from(table)]).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let column = project_column(row, idx as i64, &self.normalizer);
                if column.is_none() {
                    warn!(table = %table, row = idx, "Skipping column row without a name");
                }
                column
            })
            .collect())
    }

    async fn primary_keys(&self, table: &str) -> Result<Vec<String>> {
        let params = [SqlParam::from(table), SqlParam::from(table)];
        let rows = self.run(sql::PRIMARY_KEYS, &params).await?;
        Ok(rows.iter().filter_map(|r| r.text("RDB$FIELD_NAME")).collect())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let rows = self.run(sql::FOREIGN_KEYS, &[SqlParam::from(table)]).await?;
        Ok(pair_foreign_keys(table, &rows))
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>> {
        let params = [SqlParam::from(table), SqlParam::from(table)];
        let rows = self.run(sql::INDEXES, &params).await?;
        Ok(group_indexes(&rows))
    }
}

fn code(row: &Row, column: &str) -> Option<i32> {
    row.integer(column).and_then(|v| i32::try_from(v).ok())
}

fn project_column(
    row: &Row,
    fallback_position: i64,
    normalizer: &CharsetNormalizer,
) -> Option<ColumnDescriptor> {
    let name = row.text("RDB$FIELD_NAME")?;
    let data_type = map_type(
        code(row, "RDB$FIELD_TYPE").unwrap_or(-1),
        code(row, "RDB$FIELD_SUB_TYPE"),
        code(row, "RDB$FIELD_LENGTH"),
    );
    let not_null = row.integer("RDB$NULL_FLAG").map_or(false, |flag| flag != 0);

    Some(ColumnDescriptor {
        name,
        data_type,
        nullable: !not_null,
        default_value: decoded_text(row, "RDB$DEFAULT_SOURCE", normalizer),
        position: row
            .integer("RDB$FIELD_POSITION")
            .unwrap_or(fallback_position),
    })
}

/// Catalog text decoded with the configured charsets, trimmed, empty as `None`.
fn decoded_text(row: &Row, column: &str, normalizer: &CharsetNormalizer) -> Option<String> {
    let value = row.get(column)?.clone();
    match normalizer.normalize(value) {
        RawValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    }
}

#[derive(Default)]
struct ConstraintSegments {
    owning: BTreeMap<i64, String>,
    referenced: BTreeMap<i64, (String, String)>,
}

/// Pair owning and referenced segments of each foreign key by position.
///
/// A constraint whose two indexes do not cover the same set of positions is
/// excluded entirely rather than paired out of step.
fn pair_foreign_keys(table: &str, rows: &[Row]) -> Vec<ForeignKeyDescriptor> {
    let mut order: Vec<String> = Vec::new();
    let mut constraints: BTreeMap<String, ConstraintSegments> = BTreeMap::new();

    for row in rows {
        let (Some(name), Some(column), Some(ref_table), Some(ref_column)) = (
            row.text("RDB$CONSTRAINT_NAME"),
            row.text("RDB$FIELD_NAME"),
            row.text(sql::column::REFERENCED_TABLE),
            row.text(sql::column::REFERENCED_FIELD),
        ) else {
            warn!(table = %table, "Skipping incomplete foreign key row");
            continue;
        };
        let position = row.integer(sql::column::FIELD_POSITION).unwrap_or(0);
        let ref_position = row.integer(sql::column::REFERENCED_POSITION).unwrap_or(0);

        if !constraints.contains_key(&name) {
            order.push(name.clone());
        }
        let segments = constraints.entry(name).or_default();
        segments.owning.insert(position, column);
        segments.referenced.insert(ref_position, (ref_table, ref_column));
    }

    let mut out = Vec::new();
    for name in order {
        let Some(segments) = constraints.remove(&name) else {
            continue;
        };
        let owning: Vec<i64> = segments.owning.keys().copied().collect();
        let referenced: Vec<i64> = segments.referenced.keys().copied().collect();
        if owning != referenced {
            warn!(
                table = %table,
                constraint = %name,
                owning = ?owning,
                referenced = ?referenced,
                "Excluding foreign key with mismatched segment positions"
            );
            continue;
        }
        for (column, (referenced_table, referenced_column)) in segments
            .owning
            .into_values()
            .zip(segments.referenced.into_values())
        {
            out.push(ForeignKeyDescriptor {
                name: name.clone(),
                column,
                referenced_table,
                referenced_column,
            });
        }
    }
    out
}

fn group_indexes(rows: &[Row]) -> Vec<IndexDescriptor> {
    let mut indexes: Vec<IndexDescriptor> = Vec::new();
    for row in rows {
        let (Some(name), Some(column)) = (row.text("RDB$INDEX_NAME"), row.text("RDB$FIELD_NAME"))
        else {
            continue;
        };
        let unique = row.integer("RDB$UNIQUE_FLAG") == Some(1);
        match indexes.iter_mut().find(|i| i.name == name) {
            Some(index) => index.columns.push(column),
            None => indexes.push(IndexDescriptor {
                name,
                columns: vec![column],
                unique,
            }),
        }
    }
    indexes
}
