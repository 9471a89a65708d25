//! HTTP REST API over discovered database files
//!
//! Every endpoint is read-only. Database and table names coming from the path
//! are resolved against the database directory and the catalog before any
//! generated statement mentions them.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and charset statistics
//! - `GET /api/databases` - List database files
//! - `GET /api/databases/{db}/tables` - List user tables
//! - `GET /api/databases/{db}/tables/{table}?page&limit` - Paginated scan
//! - `GET /api/databases/{db}/tables/{table}/schema` - Table descriptor
//! - `GET /api/databases/{db}/tables/{table}/search?<fields>&page&limit` - Filtered search
//! - `POST /api/databases/{db}/query` - Ad hoc SELECT
//! - `GET /api/databases/{db}/schema` - Describe every table

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::catalog::{describe_all, CatalogReader};
use crate::charset::CharsetNormalizer;
use crate::config::{LimitsConfig, ServerConfig};
use crate::discovery::{DatabaseDirectory, DatabaseFile};
use crate::error::{ErrorCategory, FbscopeError, Result};
use crate::executor::{execute_with_deadline, SharedExecutor, SqlParam};
use crate::query::{ensure_select, FilterSet, PageRequest, Pagination, QueryBuilder, Statement};
use crate::value::Row;

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Characters escaped in one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn table_url(database: &str, table: &str) -> String {
    format!(
        "/api/databases/{}/tables/{}",
        utf8_percent_encode(database, PATH_SEGMENT),
        utf8_percent_encode(table, PATH_SEGMENT)
    )
}

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    pub directory: Arc<DatabaseDirectory>,
    pub executor: SharedExecutor,
    pub normalizer: Arc<CharsetNormalizer>,
    pub builder: Arc<QueryBuilder>,
    pub limits: LimitsConfig,
    pub analysis_workers: usize,
    /// Include error details in error responses
    pub diagnostics: bool,
}

impl ApiState {
    pub fn new(config: &ServerConfig, executor: SharedExecutor) -> Self {
        Self {
            directory: Arc::new(DatabaseDirectory::new(
                config.database.dir.clone(),
                &config.database.extensions,
            )),
            executor,
            normalizer: Arc::new(CharsetNormalizer::new(config.charsets.clone())),
            builder: Arc::new(QueryBuilder::new(
                config.search.clone(),
                config.text_binding,
                config.charsets.storage_encoding(),
            )),
            limits: config.limits,
            analysis_workers: config.analysis_workers,
            diagnostics: config.diagnostics,
        }
    }

    fn reader(&self, db: &DatabaseFile) -> CatalogReader {
        CatalogReader::new(self.executor.clone(), db.path.clone())
            .with_timeout(self.limits.statement_timeout)
            .with_normalizer(self.normalizer.clone())
    }

    fn timeout(&self) -> Option<Duration> {
        self.limits.statement_timeout
    }

    async fn run(&self, db: &DatabaseFile, statement: &Statement) -> Result<Vec<Row>> {
        execute_with_deadline(
            self.executor.as_ref(),
            &db.path,
            &statement.sql,
            &statement.params,
            self.timeout(),
        )
        .await
    }

    async fn count(&self, db: &DatabaseFile, statement: &Statement) -> Result<u64> {
        let rows = self.run(db, statement).await?;
        Ok(rows
            .first()
            .and_then(|r| r.integer("TOTAL"))
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0))
    }

    fn page(&self, query: &HashMap<String, String>) -> Result<PageRequest> {
        PageRequest::parse(
            query.get("page").map(String::as_str),
            query.get("limit").map(String::as_str),
            self.limits.default_limit,
            self.limits.max_limit,
        )
    }

    fn reject(&self, err: FbscopeError) -> ApiError {
        ApiError::from_error(err, self.diagnostics)
    }
}

/// Error envelope: `{ success: false, error, category, details? }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    /// Map an error onto a status and envelope.
    ///
    /// Caller errors carry their own message. Engine and internal failures
    /// get a generic message; the underlying error is only exposed as
    /// `details` when `diagnostics` is on.
    pub fn from_error(err: FbscopeError, diagnostics: bool) -> Self {
        let category = err.category();
        let (status, error) = match category {
            ErrorCategory::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
            ErrorCategory::InvalidRequest => (StatusCode::BAD_REQUEST, err.to_string()),
            ErrorCategory::EngineFailure if err.is_connection_failure() => (
                StatusCode::BAD_GATEWAY,
                "Failed to attach database".to_string(),
            ),
            ErrorCategory::EngineFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database query failed".to_string(),
            ),
            ErrorCategory::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        match category {
            ErrorCategory::NotFound | ErrorCategory::InvalidRequest => {
                debug!(category = %category, error = %err, "Request rejected")
            }
            _ => error!(category = %category, error = %err, "Request failed"),
        }

        let details = match category {
            ErrorCategory::EngineFailure | ErrorCategory::Internal if diagnostics => {
                Some(err.to_string())
            }
            _ => None,
        };

        Self {
            status,
            body: ErrorBody {
                success: false,
                error,
                category,
                details,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, JSON_UTF8)], Json(self.body)).into_response()
    }
}

fn respond(result: Result<Value>, state: &ApiState) -> Response {
    match result {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_UTF8)],
            Json(body),
        )
            .into_response(),
        Err(e) => state.reject(e).into_response(),
    }
}

/// Build the axum router for the REST API
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/databases", get(list_databases_handler))
        .route("/api/databases/:db/tables", get(list_tables_handler))
        .route("/api/databases/:db/tables/:table", get(scan_table_handler))
        .route(
            "/api/databases/:db/tables/:table/schema",
            get(table_schema_handler),
        )
        .route(
            "/api/databases/:db/tables/:table/search",
            get(search_table_handler),
        )
        .route("/api/databases/:db/query", post(query_handler))
        .route("/api/databases/:db/schema", get(database_schema_handler))
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<ApiState>) -> Response {
    let body = json!({
        "success": true,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "lossyDecodes": state.normalizer.lossy_decodes(),
    });
    respond(Ok(body), &state)
}

async fn list_databases_handler(State(state): State<ApiState>) -> Response {
    let result = state.directory.list_databases().map(|databases| {
        json!({
            "success": true,
            "count": databases.len(),
            "databases": databases,
        })
    });
    respond(result, &state)
}

async fn list_tables_handler(
    State(state): State<ApiState>,
    Path(db): Path<String>,
) -> Response {
    respond(list_tables(&state, &db).await, &state)
}

async fn list_tables(state: &ApiState, db: &str) -> Result<Value> {
    let db = state.directory.resolve(db)?;
    let tables = state.reader(&db).list_tables().await?;
    let entries: Vec<Value> = tables
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "url": table_url(&db.name, name),
            })
        })
        .collect();
    Ok(json!({
        "success": true,
        "database": db.name,
        "count": entries.len(),
        "tables": entries,
    }))
}

async fn scan_table_handler(
    State(state): State<ApiState>,
    Path((db, table)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(scan_table(&state, &db, &table, &query).await, &state)
}

async fn scan_table(
    state: &ApiState,
    db: &str,
    table: &str,
    query: &HashMap<String, String>,
) -> Result<Value> {
    let db = state.directory.resolve(db)?;
    let page = state.page(query)?;
    let reader = state.reader(&db);
    let table = reader.verify_table(table).await?;

    let plan = state.builder.build_scan(&table, page);
    let total = state.count(&db, &plan.count).await?;
    let rows = state.run(&db, &plan.data).await?;
    let columns = reader.column_names(&table).await?;

    Ok(json!({
        "success": true,
        "database": db.name,
        "table": table.name(),
        "pagination": Pagination::new(page, total),
        "columns": columns,
        "data": state.normalizer.normalize_rows(rows),
    }))
}

async fn table_schema_handler(
    State(state): State<ApiState>,
    Path((db, table)): Path<(String, String)>,
) -> Response {
    respond(table_schema(&state, &db, &table).await, &state)
}

async fn table_schema(state: &ApiState, db: &str, table: &str) -> Result<Value> {
    let db = state.directory.resolve(db)?;
    let reader = state.reader(&db);
    let table = reader.verify_table(table).await?;
    let descriptor = reader.describe_table(table.name()).await?;

    Ok(json!({
        "success": true,
        "database": db.name,
        "table": descriptor.name,
        "schema": {
            "columns": descriptor.columns,
            "primaryKeys": descriptor.primary_keys,
            "foreignKeys": descriptor.foreign_keys,
            "indexes": descriptor.indexes,
        },
    }))
}

async fn search_table_handler(
    State(state): State<ApiState>,
    Path((db, table)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(search_table(&state, &db, &table, &query).await, &state)
}

async fn search_table(
    state: &ApiState,
    db: &str,
    table: &str,
    query: &HashMap<String, String>,
) -> Result<Value> {
    let db = state.directory.resolve(db)?;
    let page = state.page(query)?;
    let filters = FilterSet::from_query(state.builder.fields(), query);
    let compiled = state.builder.compile_filters(&filters)?;

    let reader = state.reader(&db);
    let table = reader.verify_table(table).await?;
    let plan = state.builder.plan_search(&table, compiled, page);

    let total = state.count(&db, &plan.count).await?;
    let rows = state.run(&db, &plan.data).await?;
    let columns = reader.column_names(&table).await?;

    Ok(json!({
        "success": true,
        "database": db.name,
        "table": table.name(),
        "search": filters.echo(state.builder.fields()),
        "pagination": Pagination::new(page, total),
        "columns": columns,
        "data": state.normalizer.normalize_rows(rows),
    }))
}

/// Request body of the ad hoc query endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub params: Vec<Value>,
}

async fn query_handler(
    State(state): State<ApiState>,
    Path(db): Path<String>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(request)) => run_query(&state, &db, request).await,
        Err(rejection) => Err(FbscopeError::invalid_request(rejection.body_text())),
    };
    respond(result, &state)
}

async fn run_query(state: &ApiState, db: &str, request: QueryRequest) -> Result<Value> {
    let text = request.query.as_deref().unwrap_or_default();
    if text.trim().is_empty() {
        return Err(FbscopeError::invalid_request("query is required"));
    }
    let sql = ensure_select(text)?;
    let params = request
        .params
        .iter()
        .map(SqlParam::from_json)
        .collect::<Result<Vec<_>>>()?;

    let db = state.directory.resolve(db)?;
    info!(database = %db.name, params = params.len(), "Running ad hoc query");
    let statement = Statement {
        sql: sql.to_string(),
        params,
    };
    let rows = state.run(&db, &statement).await?;

    Ok(json!({
        "success": true,
        "database": db.name,
        "query": statement.sql,
        "count": rows.len(),
        "data": state.normalizer.normalize_rows(rows),
    }))
}

async fn database_schema_handler(
    State(state): State<ApiState>,
    Path(db): Path<String>,
) -> Response {
    respond(database_schema(&state, &db).await, &state)
}

async fn database_schema(state: &ApiState, db: &str) -> Result<Value> {
    let db = state.directory.resolve(db)?;
    let report = describe_all(&state.reader(&db), state.analysis_workers).await?;
    if !report.is_complete() {
        info!(
            database = %db.name,
            failures = report.failures.len(),
            "Schema analysis finished with failures"
        );
    }

    Ok(json!({
        "success": true,
        "database": db.name,
        "count": report.tables.len(),
        "tables": report.tables,
        "failures": report.failures,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CharsetConfig;
    use crate::testing::{column_row, table_row, ScriptedExecutor};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn create_test_state(executor: ScriptedExecutor) -> (ApiState, Arc<ScriptedExecutor>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("CLINIC.FDB"), b"").unwrap();
        let executor = Arc::new(executor);
        let state = ApiState {
            directory: Arc::new(DatabaseDirectory::new(temp_dir.path(), &["fdb".to_string()])),
            executor: executor.clone(),
            normalizer: Arc::new(CharsetNormalizer::new(CharsetConfig::default())),
            builder: Arc::new(QueryBuilder::new(
                Default::default(),
                Default::default(),
                encoding_rs::EUC_KR,
            )),
            limits: LimitsConfig::default(),
            analysis_workers: 2,
            diagnostics: false,
        };
        (state, executor, temp_dir)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _, _dir) = create_test_state(ScriptedExecutor::new());
        let (status, body) = get_json(create_api_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_list_tables() {
        let exec = ScriptedExecutor::new().respond(
            crate::catalog::sql::LIST_TABLES,
            vec![table_row("DOCTOR"), table_row("PATIENT")],
        );
        let (state, _, _dir) = create_test_state(exec);
        let (status, body) = get_json(create_api_router(state), "/api/databases/clinic/tables").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "CLINIC");
        assert_eq!(body["count"], 2);
        assert_eq!(body["tables"][1]["name"], "PATIENT");
        assert_eq!(body["tables"][1]["url"], "/api/databases/CLINIC/tables/PATIENT");
    }

    #[tokio::test]
    async fn test_table_urls_are_escaped() {
        let exec = ScriptedExecutor::new().respond(
            crate::catalog::sql::LIST_TABLES,
            vec![table_row("VISIT LOG"), table_row("A/B"), table_row("환자")],
        );
        let (state, _, _dir) = create_test_state(exec);
        let (status, body) = get_json(create_api_router(state), "/api/databases/CLINIC/tables").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"][0]["name"], "VISIT LOG");
        assert_eq!(body["tables"][0]["url"], "/api/databases/CLINIC/tables/VISIT%20LOG");
        assert_eq!(body["tables"][1]["url"], "/api/databases/CLINIC/tables/A%2FB");
        assert_eq!(
            body["tables"][2]["url"],
            "/api/databases/CLINIC/tables/%ED%99%98%EC%9E%90"
        );
    }

    #[tokio::test]
    async fn test_unknown_database_is_404() {
        let (state, exec, _dir) = create_test_state(ScriptedExecutor::new());
        let (status, body) = get_json(create_api_router(state), "/api/databases/nope/tables").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["category"], "NOT_FOUND");
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_paging_is_400_before_engine() {
        let (state, exec, _dir) = create_test_state(ScriptedExecutor::new());
        let (status, body) =
            get_json(create_api_router(state), "/api/databases/CLINIC/tables/PATIENT?page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["category"], "INVALID_REQUEST");
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scan_table() {
        let exec = ScriptedExecutor::new()
            .with_table("PATIENT", vec![column_row("PCODE", 8, None, 4, false, None, 0)])
            .respond("COUNT(*) AS TOTAL", vec![Row::new().with("TOTAL", 101i64)])
            .respond(
                "SELECT FIRST",
                vec![Row::new().with("PCODE", 1i64).with("PNAME", b"KIM  ".to_vec())],
            );
        let (state, _, _dir) = create_test_state(exec);
        let (status, body) =
            get_json(create_api_router(state), "/api/databases/CLINIC/tables/PATIENT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 101);
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["columns"], json!(["PCODE"]));
        assert_eq!(body["data"][0]["PNAME"], "KIM");
    }

    #[tokio::test]
    async fn test_engine_failure_hides_details() {
        let exec = ScriptedExecutor::new().fail_attach("CLINIC", "unavailable database");
        let (state, _, _dir) = create_test_state(exec);
        let (status, body) = get_json(create_api_router(state), "/api/databases/CLINIC/tables").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["category"], "ENGINE_FAILURE");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_diagnostics_exposes_details() {
        let exec = ScriptedExecutor::new().fail(crate::catalog::sql::LIST_TABLES, "boom");
        let (mut state, _, _dir) = create_test_state(exec);
        state.diagnostics = true;
        let (status, body) = get_json(create_api_router(state), "/api/databases/CLINIC/tables").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("boom"));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (FbscopeError::TableNotFound("X".into()), StatusCode::NOT_FOUND),
            (FbscopeError::invalid_request("x"), StatusCode::BAD_REQUEST),
            (FbscopeError::Connection("x".into()), StatusCode::BAD_GATEWAY),
            (FbscopeError::Timeout(10), StatusCode::INTERNAL_SERVER_ERROR),
            (FbscopeError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from_error(err, false).status(), expected);
        }
    }
}
