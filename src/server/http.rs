//! HTTP listener for the REST API
//!
//! Binds the configured address, serves the router and stops accepting new
//! connections on Ctrl-C (or SIGTERM on Unix) while in-flight requests finish.

use std::net::SocketAddr;

use tracing::info;

use super::api::{create_api_router, ApiState};
use crate::error::{FbscopeError, Result};

/// Start HTTP server
pub async fn start_http_server(addr: SocketAddr, state: ApiState) -> Result<()> {
    let app = create_api_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            let port = addr.port();
            FbscopeError::Config(format!(
                "HTTP port {} is already in use. \
                 Fix: Use --http-addr 0.0.0.0:{} to pick a different port, \
                 or stop the existing process.",
                port,
                port.saturating_add(100)
            ))
        } else {
            FbscopeError::Config(format!("Failed to bind HTTP server to {}: {}", addr, e))
        }
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::{CharsetConfig, CharsetNormalizer};
    use crate::config::LimitsConfig;
    use crate::discovery::DatabaseDirectory;
    use crate::executor::UnavailableExecutor;
    use crate::query::QueryBuilder;
    use std::sync::Arc;

    fn state() -> ApiState {
        ApiState {
            directory: Arc::new(DatabaseDirectory::new("./missing-db-dir", &["fdb".to_string()])),
            executor: Arc::new(UnavailableExecutor),
            normalizer: Arc::new(CharsetNormalizer::new(CharsetConfig::default())),
            builder: Arc::new(QueryBuilder::new(
                Default::default(),
                Default::default(),
                encoding_rs::EUC_KR,
            )),
            limits: LimitsConfig::default(),
            analysis_workers: 1,
            diagnostics: false,
        }
    }

    #[tokio::test]
    async fn test_port_in_use_hint() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = start_http_server(addr, state()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("already in use"), "{}", msg);
        assert!(msg.contains("--http-addr"));
    }
}
