//! Catalog introspection
//!
//! Reads the Firebird system tables of one database file and projects the
//! loosely typed rows into the fixed descriptor shapes:
//!
//! - [`types`]: field type codes to portable type names
//! - [`descriptor`]: table, column, key and index descriptors
//! - [`sql`]: the catalog statements
//! - [`reader`]: [`CatalogReader`] operations
//! - [`bulk`]: describe every table with per-table failure collection

pub mod bulk;
pub mod descriptor;
pub mod reader;
pub mod sql;
pub mod types;

pub use bulk::{describe_all, SchemaReport, TableFailure};
pub use descriptor::{
    quote_identifier, ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableDescriptor,
    VerifiedTable,
};
pub use reader::CatalogReader;
pub use types::map_type;
