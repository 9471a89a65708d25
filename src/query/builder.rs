//! Templated read-only statements for paginated scans and filtered search

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::{free_text_pattern, has_wildcard, normalize_wildcards, FieldKind, FilterSet, SearchFields};
use super::literal::{encode_hex_literal, needs_literal};
use super::pagination::PageRequest;
use crate::catalog::{quote_identifier, VerifiedTable};
use crate::error::{FbscopeError, Result};
use crate::executor::SqlParam;

/// How free-text search patterns reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextBinding {
    /// Bind ASCII patterns, embed anything else as a hex literal
    #[default]
    Auto,
    /// Always bind as a parameter
    Parameter,
    /// Always embed as a hex literal
    HexLiteral,
}

impl FromStr for TextBinding {
    type Err = FbscopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(TextBinding::Auto),
            "parameter" => Ok(TextBinding::Parameter),
            "hex_literal" => Ok(TextBinding::HexLiteral),
            other => Err(FbscopeError::config(
                "text_binding",
                format!("expected auto, parameter or hex_literal, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for TextBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextBinding::Auto => "auto",
            TextBinding::Parameter => "parameter",
            TextBinding::HexLiteral => "hex_literal",
        })
    }
}

/// Statement text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    fn bare(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }
}

/// Count and window statements of a paginated scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub count: Statement,
    pub data: Statement,
}

/// Count and window statements of a filtered search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub count: Statement,
    pub data: Statement,
    /// Predicates embedded as hex literals rather than bound
    pub embedded_literals: usize,
}

/// WHERE clause of a search with the parameters its placeholders expect.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilters {
    pub where_clause: String,
    pub params: Vec<SqlParam>,
    pub embedded_literals: usize,
}

struct Predicate {
    sql: String,
    param: Option<SqlParam>,
}

/// Builds scan and search statements for verified tables.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    fields: SearchFields,
    binding: TextBinding,
    storage_encoding: &'static Encoding,
}

impl QueryBuilder {
    pub fn new(
        fields: SearchFields,
        binding: TextBinding,
        storage_encoding: &'static Encoding,
    ) -> Self {
        Self {
            fields,
            binding,
            storage_encoding,
        }
    }

    pub fn fields(&self) -> &SearchFields {
        &self.fields
    }

    pub fn binding(&self) -> TextBinding {
        self.binding
    }

    /// Count and bounded window over a table in natural row order.
    pub fn build_scan(&self, table: &VerifiedTable, page: PageRequest) -> ScanPlan {
        let from = table.quoted();
        ScanPlan {
            count: Statement::bare(format!("SELECT COUNT(*) AS TOTAL FROM {}", from)),
            data: Statement::bare(format!(
                "SELECT FIRST {} SKIP {} * FROM {}",
                page.limit,
                page.offset(),
                from
            )),
        }
    }

    /// Compile a filter set into a WHERE clause and its parameters.
    ///
    /// Needs no table, so every malformed filter is rejected before the
    /// engine is contacted. Only bound predicates contribute a parameter;
    /// hex-literal predicates are already part of the clause text.
    pub fn compile_filters(&self, filters: &FilterSet) -> Result<CompiledFilters> {
        if filters.is_empty() {
            return Err(FbscopeError::invalid_request(format!(
                "at least one search filter is required ({})",
                self.fields.params().join(", ")
            )));
        }

        let mut predicates = Vec::with_capacity(filters.len());
        for (field, value) in filters.iter() {
            let column = quote_identifier(&field.column);
            let predicate = match field.kind {
                FieldKind::NumericId => numeric_predicate(&column, &field.param, value)?,
                FieldKind::FreeText => self.free_text_predicate(&column, value)?,
                FieldKind::ExactDate => Predicate {
                    sql: format!("{} = ?", column),
                    param: Some(SqlParam::Text(value.trim().to_string())),
                },
            };
            predicates.push(predicate);
        }

        let embedded_literals = predicates.iter().filter(|p| p.param.is_none()).count();
        let where_clause = predicates
            .iter()
            .map(|p| p.sql.as_str())
            .collect::<Vec<_>>()
            .join(" AND ");
        let params = predicates.into_iter().filter_map(|p| p.param).collect();

        Ok(CompiledFilters {
            where_clause,
            params,
            embedded_literals,
        })
    }

    /// Count and bounded window over the rows of `table` matching `filters`,
    /// ordered by the identifying column.
    pub fn plan_search(
        &self,
        table: &VerifiedTable,
        filters: CompiledFilters,
        page: PageRequest,
    ) -> SearchPlan {
        let from = table.quoted();
        let order = quote_identifier(self.fields.order_column());
        debug!(
            table = %table,
            embedded_literals = filters.embedded_literals,
            params = filters.params.len(),
            "Built search statements"
        );

        SearchPlan {
            count: Statement {
                sql: format!(
                    "SELECT COUNT(*) AS TOTAL FROM {} WHERE {}",
                    from, filters.where_clause
                ),
                params: filters.params.clone(),
            },
            data: Statement {
                sql: format!(
                    "SELECT FIRST {} SKIP {} * FROM {} WHERE {} ORDER BY {} ASC",
                    page.limit,
                    page.offset(),
                    from,
                    filters.where_clause,
                    order
                ),
                params: filters.params,
            },
            embedded_literals: filters.embedded_literals,
        }
    }

    /// [`compile_filters`](Self::compile_filters) followed by
    /// [`plan_search`](Self::plan_search).
    pub fn build_search(
        &self,
        table: &VerifiedTable,
        filters: &FilterSet,
        page: PageRequest,
    ) -> Result<SearchPlan> {
        let compiled = self.compile_filters(filters)?;
        Ok(self.plan_search(table, compiled, page))
    }

    fn embeds(&self, pattern: &str) -> bool {
        match self.binding {
            TextBinding::Auto => needs_literal(pattern),
            TextBinding::Parameter => false,
            TextBinding::HexLiteral => true,
        }
    }

    fn free_text_predicate(&self, column: &str, value: &str) -> Result<Predicate> {
        let pattern = free_text_pattern(value);
        if self.embeds(&pattern) {
            let literal = encode_hex_literal(&pattern, self.storage_encoding)?;
            Ok(Predicate {
                sql: format!("{} LIKE {}", column, literal),
                param: None,
            })
        } else {
            Ok(Predicate {
                sql: format!("{} LIKE ?", column),
                param: Some(SqlParam::Text(pattern)),
            })
        }
    }
}

fn numeric_predicate(column: &str, param: &str, value: &str) -> Result<Predicate> {
    if has_wildcard(value) {
        return Ok(Predicate {
            sql: format!("CAST({} AS VARCHAR(20)) LIKE ?", column),
            param: Some(SqlParam::Text(normalize_wildcards(value.trim()))),
        });
    }
    let id = value.trim().parse::<i64>().map_err(|_| {
        FbscopeError::invalid_request(format!("{} must be an integer, got '{}'", param, value))
    })?;
    Ok(Predicate {
        sql: format!("{} = ?", column),
        param: Some(SqlParam::Integer(id)),
    })
}
