//! Configuration module for fbscope
//!
//! This module is organized into submodules:
//! - `defaults` - Default constants and values
//! - `args` - CLI argument definitions
//! - `file` - TOML configuration file
//! - `merge` - File values applied under CLI precedence

mod args;
mod defaults;
pub mod file;
mod merge;

// Re-export submodule types
pub use args::{split_list, Command, ServerArgs};
pub use defaults::*;
pub use file::ConfigFile;
pub use merge::merge_config_with_args;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::charset::CharsetConfig;
use crate::error::{FbscopeError, Result};
use crate::query::{SearchField, SearchFields, TextBinding};

/// Where database files live.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub dir: PathBuf,
    pub extensions: Vec<String>,
}

/// Firebird server connection settings.
#[derive(Debug, Clone)]
pub struct FirebirdConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Paging limits and statement deadline.
#[derive(Debug, Clone, Copy)]
pub struct LimitsConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    /// `None` when statements run without a deadline
    pub statement_timeout: Option<Duration>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
            statement_timeout: None,
        }
    }
}

/// Complete configuration for fbscope.
///
/// Built from CLI arguments (already merged with the config file) by
/// [`ServerConfig::from_args`]; search fields come from the file only and are
/// applied with [`ServerConfig::with_search_fields`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub firebird: FirebirdConfig,
    pub charsets: CharsetConfig,
    pub text_binding: TextBinding,
    pub diagnostics: bool,
    pub limits: LimitsConfig,
    pub analysis_workers: usize,
    pub search: SearchFields,
}

impl ServerConfig {
    /// Create a new configuration from command-line arguments
    pub fn from_args(args: ServerArgs) -> Result<Self> {
        let http_addr: SocketAddr = args
            .http_addr
            .parse()
            .map_err(|e| FbscopeError::Config(format!("Invalid HTTP address: {}", e)))?;

        let charsets = CharsetConfig::from_labels(&split_list(&args.charsets))?;
        let text_binding: TextBinding = args.text_binding.parse()?;

        let statement_timeout = match args.statement_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(Self {
            http_addr,
            log_level: args.log_level,
            database: DatabaseConfig {
                dir: args.database_dir,
                extensions: split_list(&args.database_extensions),
            },
            firebird: FirebirdConfig {
                host: args.firebird_host,
                port: args.firebird_port,
                user: args.firebird_user,
                password: args.firebird_password,
            },
            charsets,
            text_binding,
            diagnostics: args.diagnostics,
            limits: LimitsConfig {
                default_limit: args.default_limit,
                max_limit: args.max_limit,
                statement_timeout,
            },
            analysis_workers: args.analysis_workers,
            search: SearchFields::default(),
        })
    }

    /// Replace the search fields, validating column identifiers.
    pub fn with_search_fields(mut self, fields: Vec<SearchField>) -> Result<Self> {
        self.search = SearchFields::new(fields)?;
        Ok(self)
    }

    /// Resolve the full configuration: config file lookup, merge under CLI
    /// precedence, conversion and validation.
    pub fn load(args: ServerArgs) -> Result<Self> {
        let (args, file) = Self::merge_file(args)?;
        Self::from_merged(args, file)
    }

    /// Look up the configuration file and apply it under CLI precedence.
    ///
    /// Split from [`ServerConfig::load`] so logging can be initialised from
    /// the merged log level before the rest of the configuration is checked.
    pub fn merge_file(args: ServerArgs) -> Result<(ServerArgs, Option<ConfigFile>)> {
        let file = match args.config {
            Some(ref path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        let args = match file {
            Some(ref file) => merge_config_with_args(args, file),
            None => args,
        };
        Ok((args, file))
    }

    /// Convert merged arguments, apply the file's search fields and validate.
    pub fn from_merged(args: ServerArgs, file: Option<ConfigFile>) -> Result<Self> {
        let mut config = Self::from_args(args)?;
        if let Some(fields) = file.and_then(|f| f.search.fields) {
            config = config.with_search_fields(fields)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.http_addr.port() == 0 {
            return Err(FbscopeError::config(
                "http_addr",
                "port must be between 1 and 65535",
            ));
        }

        if self.database.extensions.is_empty() {
            return Err(FbscopeError::config(
                "database.extensions",
                "at least one extension is required",
            ));
        }

        if self.limits.default_limit == 0 || self.limits.max_limit == 0 {
            return Err(FbscopeError::config("limits", "page limits must be positive"));
        }

        if self.limits.default_limit > self.limits.max_limit {
            return Err(FbscopeError::config(
                "limits",
                format!(
                    "default_limit {} exceeds max_limit {}",
                    self.limits.default_limit, self.limits.max_limit
                ),
            ));
        }

        if self.analysis_workers == 0 {
            return Err(FbscopeError::config(
                "analysis.workers",
                "at least one worker is required",
            ));
        }

        if self.charsets.candidates().is_empty() {
            warn!("No charset candidates configured; text columns are decoded as UTF-8 only");
        }

        if !self.database.dir.exists() {
            warn!(
                dir = %self.database.dir.display(),
                "Database directory does not exist; no databases will be listed"
            );
        }

        Ok(())
    }
}
