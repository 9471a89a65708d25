//! Firebird executor over the pure-Rust wire client
//!
//! The connection charset is pinned to ISO-8859-1 so the driver passes text
//! bytes through one-to-one. Text columns are turned back into their raw
//! bytes and left for the charset normalizer, and text parameters are
//! transcoded into the storage encoding before being handed to the driver.
//!
//! Every attachment runs its statement in a read-only transaction, so the
//! engine itself refuses writes that slip past the statement guard
//! (selectable procedures, `WITH LOCK`).

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use rsfbclient::{Queryable, SqlType, TrDataAccessMode, TransactionConfiguration};
use tracing::{debug, error};

use super::{QueryExecutor, SqlParam};
use crate::error::{FbscopeError, Result};
use crate::value::{RawValue, Row};

/// Server connection settings shared by every attachment.
#[derive(Debug, Clone)]
pub struct FirebirdOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Executes each statement on a fresh attachment inside a blocking task.
pub struct FirebirdExecutor {
    options: FirebirdOptions,
    storage_encoding: &'static Encoding,
}

impl FirebirdExecutor {
    pub fn new(options: FirebirdOptions, storage_encoding: &'static Encoding) -> Self {
        Self {
            options,
            storage_encoding,
        }
    }

    fn run_blocking(
        options: &FirebirdOptions,
        target: &Path,
        sql: &str,
        params: Vec<SqlType>,
    ) -> Result<Vec<Row>> {
        let db_name = absolute(target);
        let mut conn = rsfbclient::builder_pure_rust()
            .host(options.host.as_str())
            .port(options.port)
            .db_name(db_name.to_string_lossy().into_owned())
            .user(options.user.as_str())
            .pass(options.password.as_str())
            .charset(rsfbclient::charset::ISO_8859_1)
            .transaction(read_only_transaction())
            .connect()
            .map_err(|e| {
                error!(
                    host = %options.host,
                    port = options.port,
                    database = %db_name.display(),
                    user = %options.user,
                    error = %e,
                    "Firebird attach failed"
                );
                FbscopeError::Connection(format!("{}: {}", db_name.display(), e))
            })?;

        let result: std::result::Result<Vec<rsfbclient::Row>, _> = conn.query(sql, params);
        if let Err(e) = conn.close() {
            debug!(error = %e, "Detach reported an error");
        }

        let rows = result.map_err(|e| FbscopeError::Statement(e.to_string()))?;
        Ok(rows.into_iter().map(convert_row).collect())
    }

    fn to_driver_param(&self, param: &SqlParam) -> Result<SqlType> {
        Ok(match param {
            SqlParam::Integer(n) => SqlType::Integer(*n),
            SqlParam::Float(f) => SqlType::Floating(*f),
            SqlParam::Null => SqlType::Null,
            SqlParam::Text(s) => {
                let (bytes, _, unmappable) = self.storage_encoding.encode(s);
                if unmappable {
                    return Err(FbscopeError::invalid_request(format!(
                        "parameter cannot be represented in {}",
                        self.storage_encoding.name()
                    )));
                }
                SqlType::Text(bytes.iter().map(|&b| char::from(b)).collect())
            }
        })
    }
}

#[async_trait::async_trait]
impl QueryExecutor for FirebirdExecutor {
    async fn execute(&self, target: &Path, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let params = params
            .iter()
            .map(|p| self.to_driver_param(p))
            .collect::<Result<Vec<_>>>()?;
        let options = self.options.clone();
        let target = target.to_path_buf();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || Self::run_blocking(&options, &target, &sql, params))
            .await
            .map_err(|e| FbscopeError::Internal(format!("executor task failed: {}", e)))?
    }

    fn supports_concurrent_statements(&self) -> bool {
        // every statement gets its own attachment
        true
    }
}

/// Transaction settings for every attachment: the driver default is
/// read-write.
fn read_only_transaction() -> TransactionConfiguration {
    TransactionConfiguration {
        data_access: TrDataAccessMode::ReadOnly,
        ..TransactionConfiguration::default()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn convert_row(row: rsfbclient::Row) -> Row {
    row.cols
        .into_iter()
        .map(|col| (col.name, convert_value(col.value)))
        .collect()
}

#[allow(unreachable_patterns)]
fn convert_value(value: SqlType) -> RawValue {
    match value {
        SqlType::Null => RawValue::Null,
        SqlType::Integer(n) => RawValue::Integer(n),
        SqlType::Floating(f) => RawValue::Float(f),
        SqlType::Boolean(b) => RawValue::Bool(b),
        SqlType::Timestamp(ts) => RawValue::Timestamp(ts),
        SqlType::Binary(bytes) => RawValue::Bytes(bytes),
        // ISO-8859-1 maps every byte to the code point of the same value
        SqlType::Text(s) => RawValue::Bytes(latin1_bytes(&s)),
        _ => RawValue::Null,
    }
}

fn latin1_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
