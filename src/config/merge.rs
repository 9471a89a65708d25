//! Configuration merging utilities
//!
//! This module provides functions to merge configuration from files
//! with command-line arguments, where CLI arguments take precedence.

use super::args::ServerArgs;
use super::defaults::*;
use super::file::ConfigFile;

/// Merge configuration file values with CLI arguments.
/// CLI arguments take precedence over config file values.
/// Only applies config file values where CLI uses defaults.
pub fn merge_config_with_args(mut args: ServerArgs, config: &ConfigFile) -> ServerArgs {
    // Helper macro to apply config value if CLI is at default
    macro_rules! apply_if_default {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(val) = $config_val {
                if args.$field == $default {
                    args.$field = val;
                }
            }
        };
    }

    macro_rules! apply_if_default_string {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref val) = $config_val {
                if args.$field == $default {
                    args.$field = val.clone();
                }
            }
        };
    }

    macro_rules! apply_if_default_list {
        ($field:ident, $config_val:expr, $default:expr) => {
            if let Some(ref list) = $config_val {
                if args.$field == $default {
                    args.$field = list.join(",");
                }
            }
        };
    }

    // Server section
    apply_if_default_string!(http_addr, config.server.http_addr, DEFAULT_HTTP_ADDR);
    apply_if_default_string!(log_level, config.server.log_level, DEFAULT_LOG_LEVEL);
    apply_if_default!(diagnostics, config.server.diagnostics, DEFAULT_DIAGNOSTICS);

    // Database section
    if let Some(ref dir) = config.database.dir {
        if args.database_dir == std::path::Path::new(DEFAULT_DATABASE_DIR) {
            args.database_dir = dir.clone();
        }
    }
    apply_if_default_list!(
        database_extensions,
        config.database.extensions,
        DEFAULT_DATABASE_EXTENSIONS
    );

    // Firebird section
    apply_if_default_string!(firebird_host, config.firebird.host, DEFAULT_FIREBIRD_HOST);
    apply_if_default!(firebird_port, config.firebird.port, DEFAULT_FIREBIRD_PORT);
    apply_if_default_string!(firebird_user, config.firebird.user, DEFAULT_FIREBIRD_USER);
    apply_if_default_string!(
        firebird_password,
        config.firebird.password,
        DEFAULT_FIREBIRD_PASSWORD
    );

    // Charset section
    apply_if_default_list!(charsets, config.charset.candidates, DEFAULT_CHARSETS);
    apply_if_default_string!(
        text_binding,
        config.charset.text_binding,
        DEFAULT_TEXT_BINDING
    );

    // Limits section
    apply_if_default!(default_limit, config.limits.default_limit, DEFAULT_PAGE_LIMIT);
    apply_if_default!(max_limit, config.limits.max_limit, DEFAULT_MAX_PAGE_LIMIT);
    apply_if_default!(
        statement_timeout_ms,
        config.limits.statement_timeout_ms,
        DEFAULT_STATEMENT_TIMEOUT_MS
    );

    // Analysis section
    apply_if_default!(
        analysis_workers,
        config.analysis.workers,
        DEFAULT_ANALYSIS_WORKERS
    );

    args
}
