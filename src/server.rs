//! HTTP API over the persisted agency metrics.
//!
//! Every endpoint is a pure read of the `agency_metrics` table except
//! `POST /api/refresh`, which triggers a full ingestion run. Refresh holds a
//! run lock: a second trigger while a run is active is rejected with `409`
//! rather than racing it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/agencies` | All agency metrics rows |
//! | `GET`  | `/api/agencies/top?limit=N` | Top N agencies by word count |
//! | `GET`  | `/api/agencies/{name}` | One agency by name |
//! | `POST` | `/api/refresh` | Run the ingestion pipeline now |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no agency named ..." } }
//! ```
//!
//! Error codes: `not_found` (404), `refresh_in_progress` (409), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::ingest::{self, IngestReport};
use crate::models::AgencyMetrics;
use crate::store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    /// Run-level mutual exclusion for refresh triggers.
    refresh_lock: Arc<Mutex<()>>,
}

/// Starts the metrics API server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = crate::db::connect(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        refresh_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/agencies", get(handle_list_agencies))
        .route("/api/agencies/top", get(handle_top_agencies))
        .route("/api/agencies/{name}", get(handle_agency_detail))
        .route("/api/refresh", post(handle_refresh))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn refresh_in_progress() -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "refresh_in_progress".to_string(),
        message: "an ingestion run is already active".to_string(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/agencies ============

async fn handle_list_agencies(
    State(state): State<AppState>,
) -> Result<Json<Vec<AgencyMetrics>>, AppError> {
    let agencies = store::list_agencies(&state.pool).await.map_err(internal)?;
    Ok(Json(agencies))
}

// ============ GET /api/agencies/top ============

#[derive(Deserialize)]
struct TopParams {
    limit: Option<i64>,
}

async fn handle_top_agencies(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<AgencyMetrics>>, AppError> {
    let limit = params.limit.unwrap_or(10).max(1);
    let top = store::top_agencies_by_word_count(&state.pool, limit)
        .await
        .map_err(internal)?;
    Ok(Json(top))
}

// ============ GET /api/agencies/{name} ============

async fn handle_agency_detail(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AgencyMetrics>, AppError> {
    let agency = store::get_agency(&state.pool, &name)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no agency named: {}", name)))?;
    Ok(Json(agency))
}

// ============ POST /api/refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    status: String,
    report: IngestReport,
}

async fn handle_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    // Overlapping runs would only duplicate fetch/parse work, but there is
    // no reason to allow the race; reject the second trigger outright.
    let _guard = state
        .refresh_lock
        .try_lock()
        .map_err(|_| refresh_in_progress())?;

    let report = ingest::run_ingest(&state.config).await.map_err(internal)?;
    Ok(Json(RefreshResponse {
        status: "ok".to_string(),
        report,
    }))
}
