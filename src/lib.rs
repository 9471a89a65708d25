#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # fbscope
//!
//! fbscope is a read-only HTTP gateway over Firebird database files. It reads
//! the engine's system catalog to describe tables portably, decodes text
//! stored in legacy national encodings, and serves paginated scans and
//! filtered searches without callers having to know catalog layouts or
//! charset quirks.
//!
//! ## Quick Start
//!
//! ```bash
//! # Build with the Firebird driver
//! $ cargo build --release --features firebird
//!
//! # Serve every *.fdb file in ./Db on 0.0.0.0:3000
//! $ fbscope
//!
//! # Export every table descriptor as JSON
//! $ fbscope analyze --output db-schema
//!
//! # Check that a database can be attached
//! $ fbscope check CLINIC
//! ```
//!
//! ## Library Usage
//!
//! The catalog and query layers only need a [`executor::QueryExecutor`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use fbscope::catalog::CatalogReader;
//! use fbscope::executor::UnavailableExecutor;
//!
//! #[tokio::main]
//! async fn main() -> fbscope::Result<()> {
//!     let reader = CatalogReader::new(Arc::new(UnavailableExecutor), "Db/CLINIC.FDB");
//!     for table in reader.list_tables().await? {
//!         let descriptor = reader.describe_table(&table).await?;
//!         println!("{} has {} columns", table, descriptor.columns.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`charset`]: decoding raw column bytes and rendering temporal values
//! - [`catalog`]: type mapping, catalog statements, descriptors, bulk analysis
//! - [`query`]: pagination, search filters, hex literals, statement builder
//! - [`executor`]: the statement execution seam and its Firebird driver
//! - [`discovery`]: database files in the configured directory
//! - [`server`]: REST API and HTTP listener
//! - [`config`]: CLI arguments, configuration file, validated settings
//! - [`error`]: error types, categories and Result alias

pub mod catalog;
pub mod charset;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod query;
pub mod server;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod value;

pub use config::{ServerArgs, ServerConfig};
pub use error::{ErrorCategory, FbscopeError, Result};
pub use server::Server;
