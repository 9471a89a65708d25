//! Server implementation for fbscope
//!
//! [`Server`] wires the configuration and a query executor into the REST API
//! and runs the HTTP listener until shutdown.

pub mod api;
pub mod http;

pub use api::{create_api_router, ApiError, ApiState, QueryRequest};
pub use http::start_http_server;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::executor::SharedExecutor;

/// The fbscope HTTP server.
pub struct Server {
    config: ServerConfig,
    state: ApiState,
}

impl Server {
    pub fn new(config: ServerConfig, executor: SharedExecutor) -> Self {
        let state = ApiState::new(&config, executor);
        Self { config, state }
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        match self.state.directory.list_databases() {
            Ok(databases) => info!(
                dir = %self.config.database.dir.display(),
                databases = databases.len(),
                "Database directory scanned"
            ),
            Err(e) => warn!(
                dir = %self.config.database.dir.display(),
                error = %e,
                "Failed to scan database directory"
            ),
        }

        if self.config.diagnostics {
            warn!("Diagnostics mode is ON: error responses include engine details");
        }

        info!(
            charsets = ?self.config.charsets.candidates().iter().map(|e| e.name()).collect::<Vec<_>>(),
            text_binding = %self.config.text_binding,
            "Charset handling"
        );

        start_http_server(self.config.http_addr, self.state).await
    }
}
