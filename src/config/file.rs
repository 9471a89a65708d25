//! Configuration file support for fbscope
//!
//! This module provides TOML configuration file parsing and merging with CLI arguments.
//!
//! ## Priority Order
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! Search fields can only be set in the file.
//!
//! ## Example Configuration
//!
//! ```toml
//! # fbscope.toml
//!
//! [server]
//! http_addr = "0.0.0.0:3000"
//! log_level = "info"
//! diagnostics = false
//!
//! [database]
//! dir = "./Db"
//! extensions = ["fdb"]
//!
//! [firebird]
//! host = "localhost"
//! port = 3050
//!
//! [charset]
//! candidates = ["euc-kr"]
//! text_binding = "auto"
//!
//! [[search.fields]]
//! param = "pcode"
//! column = "PCODE"
//! kind = "numeric_id"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FbscopeError, Result};
use crate::query::SearchField;

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server configuration
    pub server: ServerSection,

    /// Database discovery configuration
    pub database: DatabaseSection,

    /// Firebird server connection
    pub firebird: FirebirdSection,

    /// Text decoding and binding
    pub charset: CharsetSection,

    /// Paging and statement limits
    pub limits: LimitsSection,

    /// Bulk schema analysis
    pub analysis: AnalysisSection,

    /// Search field mapping
    pub search: SearchSection,
}

/// Server section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP API listen address
    pub http_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,

    /// Include error details in HTTP error responses
    pub diagnostics: Option<bool>,
}

/// Database section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Directory scanned for database files
    pub dir: Option<PathBuf>,

    /// Database file extensions
    pub extensions: Option<Vec<String>>,
}

/// Firebird section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebirdSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Charset section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharsetSection {
    /// Candidate encodings in priority order
    pub candidates: Option<Vec<String>>,

    /// Free-text binding policy
    pub text_binding: Option<String>,
}

/// Limits section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub default_limit: Option<u64>,
    pub max_limit: Option<u64>,
    pub statement_timeout_ms: Option<u64>,
}

/// Analysis section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub workers: Option<usize>,
}

/// Search section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub fields: Option<Vec<SearchField>>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FbscopeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            FbscopeError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Try to load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./fbscope.toml
    /// 2. /etc/fbscope/fbscope.toml
    /// 3. ~/.config/fbscope/fbscope.toml
    pub fn load_default() -> Option<Self> {
        let default_paths = [
            PathBuf::from("fbscope.toml"),
            PathBuf::from("/etc/fbscope/fbscope.toml"),
            dirs::config_dir()
                .map(|p| p.join("fbscope/fbscope.toml"))
                .unwrap_or_default(),
        ];

        for path in default_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {:?}", path);
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        None
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# fbscope Configuration File
# Copy to fbscope.toml and customize as needed
#
# Configuration priority (highest to lowest):
# 1. Command-line arguments
# 2. Environment variables
# 3. This configuration file
# 4. Default values

[server]
# HTTP API listen address
http_addr = "0.0.0.0:3000"

# Log level (trace, debug, info, warn, error)
log_level = "info"

# Include error details in error responses
diagnostics = false

[database]
# Directory scanned for database files
dir = "./Db"

# File extensions treated as databases (case-insensitive)
extensions = ["fdb"]

[firebird]
host = "localhost"
port = 3050
user = "SYSDBA"
password = "masterkey"

[charset]
# Encodings tried in order before UTF-8 when decoding text columns
candidates = ["euc-kr"]

# auto | parameter | hex_literal
text_binding = "auto"

[limits]
default_limit = 100
max_limit = 1000
# 0 disables the per-statement deadline
statement_timeout_ms = 30000

[analysis]
# Tables described concurrently by the bulk schema endpoint and `fbscope analyze`
workers = 4

# Query-string parameters accepted by the search endpoint
# kind: numeric_id | free_text | exact_date
[[search.fields]]
param = "pcode"
column = "PCODE"
kind = "numeric_id"

[[search.fields]]
param = "pname"
column = "PNAME"
kind = "free_text"

[[search.fields]]
param = "pbirth"
column = "PBIRTH"
kind = "exact_date"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{filter::default_fields, FieldKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_empty_config() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert!(config.server.http_addr.is_none());
        assert!(config.search.fields.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[database]
dir = "/srv/firebird"

[charset]
candidates = ["euc-kr", "windows-1252"]
"#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.database.dir, Some(PathBuf::from("/srv/firebird")));
        assert_eq!(
            config.charset.candidates,
            Some(vec!["euc-kr".to_string(), "windows-1252".to_string()])
        );
        assert!(config.firebird.host.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: ConfigFile = toml::from_str(&ConfigFile::generate_example()).unwrap();
        assert_eq!(config.server.http_addr.as_deref(), Some("0.0.0.0:3000"));
        assert_eq!(config.search.fields, Some(default_fields()));
        assert_eq!(config.analysis.workers, Some(4));
    }

    #[test]
    fn test_search_field_kinds() {
        let toml = r#"
[[search.fields]]
param = "chart"
column = "CHART_NO"
kind = "numeric_id"
"#;
        let config: ConfigFile = toml::from_str(toml).unwrap();
        let fields = config.search.fields.unwrap();
        assert_eq!(fields[0].kind, FieldKind::NumericId);
        assert_eq!(fields[0].column, "CHART_NO");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[firebird]\nport = 3051").unwrap();
        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.firebird.port, Some(3051));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[firebird\nport = ").unwrap();
        assert!(ConfigFile::load(file.path()).is_err());
    }
}
