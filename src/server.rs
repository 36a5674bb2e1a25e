//! HTTP API server.
//!
//! Exposes the search pipeline and its filter metadata as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/search` | Filter, enrich and return matching records |
//! | `GET`  | `/api/filters` | Filter menu (sources, platforms, year ranges) |
//! | `GET`  | `/api/sources` | Configured corpus sources with health |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/api/search` takes comma-separated lists:
//! `?query=ansiedad&source=openData&platform=facebook,twitter&time=2015_2019`.
//! The older parameter names `fuente` (for `source`) and `socialNetwork`
//! (for `platform`) are accepted too; values given under both are merged.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unknown_source", "message": "unknown source: 'foo'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unknown_source` (400),
//! `data_unavailable` (503), `filter_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends can
//! call the API directly.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analysis::TextAnalyzer;
use crate::config::Config;
use crate::error::SearchError;
use crate::menu::{build_menu, MenuGroup};
use crate::search::{SearchRequest, SearchResponse, SearchService};
use crate::sources::{get_sources, SourceStatus};

#[derive(Clone)]
struct AppState {
    service: Arc<SearchService>,
}

/// Starts the HTTP server with the analyzer named in `[analyzer]`.
///
/// Binds to `[server].bind` and runs until Ctrl-C, then shuts the analyzer
/// down.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = SearchService::from_config(Arc::new(config.clone()))?;
    serve(Arc::new(service)).await
}

/// Like [`run_server`], but with a caller-supplied analyzer.
pub async fn run_server_with_analyzer(
    config: &Config,
    analyzer: Arc<dyn TextAnalyzer>,
) -> anyhow::Result<()> {
    let service = SearchService::with_analyzer(Arc::new(config.clone()), analyzer)?;
    serve(Arc::new(service)).await
}

async fn serve(service: Arc<SearchService>) -> anyhow::Result<()> {
    service.start().await?;

    let bind_addr = service.config().server.bind.clone();
    let app = router(service.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.stop().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Build the application router around a started service.
pub fn router(service: Arc<SearchService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/search", get(handle_search))
        .route("/api/filters", get(handle_filters))
        .route("/api/sources", get(handle_sources))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let (status, code) = match &err {
            SearchError::UnknownSource(_) => (StatusCode::BAD_REQUEST, "unknown_source"),
            SearchError::DataSource(_) => (StatusCode::SERVICE_UNAVAILABLE, "data_unavailable"),
            SearchError::Filter(_) => (StatusCode::INTERNAL_SERVER_ERROR, "filter_error"),
            SearchError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "search failed");
        }
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
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

// ============ GET /api/search ============

/// Query-string parameters for `GET /api/search`. List values are
/// comma-separated; a list given under both its name and its legacy name
/// is merged.
#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    source: Option<String>,
    fuente: Option<String>,
    platform: Option<String>,
    #[serde(rename = "socialNetwork")]
    social_network: Option<String>,
    time: Option<String>,
}

fn merge_lists(primary: Option<String>, legacy: Option<String>) -> Option<String> {
    match (primary, legacy) {
        (Some(a), Some(b)) => Some(format!("{},{}", a, b)),
        (a, b) => a.or(b),
    }
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let sources = merge_lists(params.source, params.fuente);
    let platforms = merge_lists(params.platform, params.social_network);
    let request = SearchRequest::from_params(
        params.query.as_deref(),
        sources.as_deref(),
        platforms.as_deref(),
        params.time.as_deref(),
    );
    let response = state.service.search(&request).await?;
    Ok(Json(response))
}

// ============ GET /api/filters ============

async fn handle_filters(State(state): State<AppState>) -> Json<Vec<MenuGroup>> {
    Json(build_menu(state.service.config()))
}

// ============ GET /api/sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

async fn handle_sources(
    State(state): State<AppState>,
) -> Result<Json<SourcesResponse>, AppError> {
    let sources = get_sources(state.service.config()).map_err(internal)?;
    Ok(Json(SourcesResponse { sources }))
}
