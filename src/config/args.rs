//! Command-line arguments for fbscope
//!
//! This module defines the CLI arguments structure using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::defaults::*;

/// Command-line arguments for fbscope
#[derive(Parser, Debug, Clone)]
#[command(name = "fbscope")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read-only HTTP gateway for Firebird database files")]
pub struct ServerArgs {
    /// Path to configuration file (TOML format)
    /// If not specified, looks for fbscope.toml in current directory,
    /// /etc/fbscope/, or ~/.config/fbscope/
    #[arg(short, long, env = "FBSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Address to listen on for the HTTP API
    #[arg(long, env = "FBSCOPE_HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: String,

    /// Directory scanned for database files
    #[arg(long, env = "FBSCOPE_DATABASE_DIR", default_value = DEFAULT_DATABASE_DIR)]
    pub database_dir: PathBuf,

    /// Database file extensions, comma separated (matched case-insensitively)
    #[arg(long, env = "FBSCOPE_DATABASE_EXTENSIONS", default_value = DEFAULT_DATABASE_EXTENSIONS)]
    pub database_extensions: String,

    /// Firebird server host
    #[arg(long, env = "FBSCOPE_FIREBIRD_HOST", default_value = DEFAULT_FIREBIRD_HOST)]
    pub firebird_host: String,

    /// Firebird server port
    #[arg(long, env = "FBSCOPE_FIREBIRD_PORT", default_value_t = DEFAULT_FIREBIRD_PORT)]
    pub firebird_port: u16,

    /// Firebird user
    #[arg(long, env = "FBSCOPE_FIREBIRD_USER", default_value = DEFAULT_FIREBIRD_USER)]
    pub firebird_user: String,

    /// Firebird password
    #[arg(long, env = "FBSCOPE_FIREBIRD_PASSWORD", default_value = DEFAULT_FIREBIRD_PASSWORD, hide_env_values = true)]
    pub firebird_password: String,

    /// Candidate encodings for text columns, in priority order, comma separated.
    /// UTF-8 is always tried after these.
    #[arg(long, env = "FBSCOPE_CHARSETS", default_value = DEFAULT_CHARSETS)]
    pub charsets: String,

    /// How free-text search patterns are sent:
    ///   "auto"        - bind ASCII patterns, embed others as hex literals
    ///   "parameter"   - always bind
    ///   "hex_literal" - always embed
    #[arg(long, env = "FBSCOPE_TEXT_BINDING", default_value = DEFAULT_TEXT_BINDING)]
    pub text_binding: String,

    /// Include error details in HTTP error responses
    #[arg(long, env = "FBSCOPE_DIAGNOSTICS", default_value_t = DEFAULT_DIAGNOSTICS)]
    pub diagnostics: bool,

    /// Page size used when a request omits `limit`
    #[arg(long, env = "FBSCOPE_DEFAULT_LIMIT", default_value_t = DEFAULT_PAGE_LIMIT)]
    pub default_limit: u64,

    /// Largest `limit` a request may ask for
    #[arg(long, env = "FBSCOPE_MAX_LIMIT", default_value_t = DEFAULT_MAX_PAGE_LIMIT)]
    pub max_limit: u64,

    /// Per-statement timeout in milliseconds (0 disables)
    #[arg(long, env = "FBSCOPE_STATEMENT_TIMEOUT_MS", default_value_t = DEFAULT_STATEMENT_TIMEOUT_MS)]
    pub statement_timeout_ms: u64,

    /// Tables described concurrently during bulk schema analysis
    #[arg(long, env = "FBSCOPE_ANALYSIS_WORKERS", default_value_t = DEFAULT_ANALYSIS_WORKERS)]
    pub analysis_workers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FBSCOPE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Run a one-off command instead of the HTTP server
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// One-off commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Describe every table of every database and write one JSON file per database
    Analyze {
        /// Output directory
        #[arg(long, short, default_value = DEFAULT_SCHEMA_OUTPUT_DIR)]
        output: PathBuf,
    },
    /// Attach one database and report its user table count
    Check {
        /// Logical database name (file name without extension)
        database: String,
    },
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
