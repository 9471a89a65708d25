//! Portable descriptors built from catalog rows

use serde::Serialize;
use tracing::warn;

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Portable type name, e.g. `VARCHAR(50)`
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub position: i64,
}

/// One column pairing of a foreign key.
///
/// Multi-column keys show up as several descriptors sharing `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// A supplementary index; constraint-backing indexes are not reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    /// Assemble a descriptor, ordering columns by position and dropping key
    /// entries that name a column the table does not have.
    pub fn assemble(
        name: impl Into<String>,
        mut columns: Vec<ColumnDescriptor>,
        primary_keys: Vec<String>,
        foreign_keys: Vec<ForeignKeyDescriptor>,
        indexes: Vec<IndexDescriptor>,
    ) -> Self {
        let name = name.into();
        columns.sort_by_key(|c| c.position);

        let has_column = |n: &str| columns.iter().any(|c| c.name == n);

        let primary_keys = primary_keys
            .into_iter()
            .filter(|pk| {
                let known = has_column(pk.as_str());
                if !known {
                    warn!(table = %name, column = %pk, "Dropping primary key on unknown column");
                }
                known
            })
            .collect();

        let foreign_keys = foreign_keys
            .into_iter()
            .filter(|fk| {
                let known = has_column(fk.column.as_str());
                if !known {
                    warn!(
                        table = %name,
                        constraint = %fk.name,
                        column = %fk.column,
                        "Dropping foreign key on unknown column"
                    );
                }
                known
            })
            .collect();

        Self {
            name,
            columns,
            primary_keys,
            foreign_keys,
            indexes,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A table name confirmed to exist in the catalog of a specific database.
///
/// Only [`CatalogReader::verify_table`](super::CatalogReader::verify_table)
/// hands these out, which makes it the single gate between request input and
/// identifiers spliced into statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTable(String);

impl VerifiedTable {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Name as a quoted SQL identifier.
    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }
}

impl std::fmt::Display for VerifiedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
