//! fbscope - read-only HTTP gateway for Firebird database files

use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use fbscope::catalog::{describe_all, CatalogReader};
use fbscope::config::{Command, ConfigFile};
use fbscope::charset::CharsetNormalizer;
use fbscope::discovery::{DatabaseDirectory, DatabaseFile};
use fbscope::executor::SharedExecutor;
use fbscope::{FbscopeError, Result, Server, ServerArgs, ServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("fbscope failed: {e} [{}]", e.category());
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    // Parse command-line arguments (before runtime creation)
    let args = ServerArgs::parse();

    // Handle --generate-config flag
    if args.generate_config {
        println!("{}", ConfigFile::generate_example());
        return Ok(());
    }

    // Config file lookup and merge under CLI precedence, before logging so
    // the file's log level applies
    let (args, file) = ServerConfig::merge_file(args)?;

    // Initialize logging
    init_logging(&args.log_level);

    let command = args.command.clone();

    let config = match ServerConfig::from_merged(args, file) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return Err(FbscopeError::Internal(format!(
                "Failed to create Tokio runtime: {}",
                e
            )));
        }
    };

    let executor = build_executor(&config);

    runtime.block_on(async move {
        match command {
            None => Server::new(config, executor).run().await,
            Some(Command::Analyze { output }) => analyze(&config, executor, &output).await,
            Some(Command::Check { database }) => check(&config, executor, &database).await,
        }
    })
}

fn init_logging(level: &str) {
    let log_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter)
        .init();
}

#[cfg(feature = "firebird")]
fn build_executor(config: &ServerConfig) -> SharedExecutor {
    use fbscope::executor::{FirebirdExecutor, FirebirdOptions};

    let options = FirebirdOptions {
        host: config.firebird.host.clone(),
        port: config.firebird.port,
        user: config.firebird.user.clone(),
        password: config.firebird.password.clone(),
    };
    info!(
        host = %options.host,
        port = options.port,
        storage_encoding = config.charsets.storage_encoding().name(),
        "Using Firebird executor"
    );
    Arc::new(FirebirdExecutor::new(
        options,
        config.charsets.storage_encoding(),
    ))
}

#[cfg(not(feature = "firebird"))]
fn build_executor(_config: &ServerConfig) -> SharedExecutor {
    warn!(
        "Built without the `firebird` feature: every database attach will fail. \
         Rebuild with --features firebird to reach a Firebird server."
    );
    Arc::new(fbscope::executor::UnavailableExecutor)
}

fn directory(config: &ServerConfig) -> DatabaseDirectory {
    DatabaseDirectory::new(config.database.dir.clone(), &config.database.extensions)
}

fn catalog_reader(
    config: &ServerConfig,
    executor: SharedExecutor,
    db: &DatabaseFile,
) -> CatalogReader {
    CatalogReader::new(executor, db.path.clone())
        .with_timeout(config.limits.statement_timeout)
        .with_normalizer(Arc::new(CharsetNormalizer::new(config.charsets.clone())))
}

/// Describe every table of every database into `<output>/<database>.json`.
async fn analyze(config: &ServerConfig, executor: SharedExecutor, output: &Path) -> Result<()> {
    let databases = directory(config).list_databases()?;
    if databases.is_empty() {
        warn!(dir = %config.database.dir.display(), "No database files found");
        return Ok(());
    }
    std::fs::create_dir_all(output)?;

    let mut written = 0usize;
    for db in &databases {
        let reader = catalog_reader(config, executor.clone(), db);
        let report = match describe_all(&reader, config.analysis_workers).await {
            Ok(report) => report,
            Err(e) => {
                error!(database = %db.name, error = %e, "Failed to analyze database");
                continue;
            }
        };

        for failure in &report.failures {
            warn!(
                database = %db.name,
                table = %failure.table,
                category = %failure.category,
                error = %failure.error,
                "Table skipped"
            );
        }

        let path = output.join(format!("{}.json", db.name));
        std::fs::write(&path, serde_json::to_string_pretty(&report.tables)?)?;
        info!(
            database = %db.name,
            tables = report.tables.len(),
            failures = report.failures.len(),
            path = %path.display(),
            "Schema written"
        );
        written += 1;
    }

    info!(
        databases = databases.len(),
        written,
        output = %output.display(),
        "Analysis complete"
    );
    Ok(())
}

/// Attach one database and print its user table count.
async fn check(config: &ServerConfig, executor: SharedExecutor, database: &str) -> Result<()> {
    let db = directory(config).resolve(database)?;
    let reader = catalog_reader(config, executor, &db);
    let tables = reader.list_tables().await?;
    println!("{}: {} user tables ({})", db.name, tables.len(), db.path.display());
    Ok(())
}
