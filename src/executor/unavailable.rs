use std::path::Path;

use super::{QueryExecutor, SqlParam};
use crate::error::{FbscopeError, Result};
use crate::value::Row;

/// Executor for builds without an engine driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableExecutor;

#[async_trait::async_trait]
impl QueryExecutor for UnavailableExecutor {
    async fn execute(&self, target: &Path, _sql: &str, _params: &[SqlParam]) -> Result<Vec<Row>> {
        Err(FbscopeError::Connection(format!(
            "cannot attach {}: fbscope was built without the `firebird` feature",
            target.display()
        )))
    }
}
