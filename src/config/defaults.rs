//! Default constants for fbscope configuration
//!
//! These constants define the default values used throughout the configuration
//! system when no explicit value is provided.

/// Default listen address for the HTTP API
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Default directory scanned for database files
pub const DEFAULT_DATABASE_DIR: &str = "./Db";

/// Default database file extensions (comma separated)
pub const DEFAULT_DATABASE_EXTENSIONS: &str = "fdb";

/// Default Firebird server host
pub const DEFAULT_FIREBIRD_HOST: &str = "localhost";

/// Default Firebird server port
pub const DEFAULT_FIREBIRD_PORT: u16 = 3050;

/// Default Firebird user
pub const DEFAULT_FIREBIRD_USER: &str = "SYSDBA";

/// Default Firebird password
pub const DEFAULT_FIREBIRD_PASSWORD: &str = "masterkey";

/// Default ordered charset candidates (comma separated)
pub const DEFAULT_CHARSETS: &str = "euc-kr";

/// Default free-text binding policy ("auto", "parameter", "hex_literal")
pub const DEFAULT_TEXT_BINDING: &str = "auto";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default page size when a request omits `limit`
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Largest accepted `limit`
pub const DEFAULT_MAX_PAGE_LIMIT: u64 = 1000;

/// Default per-statement timeout in milliseconds (0 disables the deadline)
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 30_000;

/// Default number of tables described concurrently during bulk analysis
pub const DEFAULT_ANALYSIS_WORKERS: usize = 4;

/// Default output directory of `fbscope analyze`
pub const DEFAULT_SCHEMA_OUTPUT_DIR: &str = "db-schema";

/// Default diagnostics mode
pub const DEFAULT_DIAGNOSTICS: bool = false;
