//! HTTP transport for ingestion and search.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/api/documents/upload` | multipart: `file`, `title` |
//! | `POST` | `/api/documents/search` | JSON: `{"query": "..."}` |
//! | `GET`  | `/health` | |
//!
//! Failures answer `{"error": "..."}` with 400 for caller mistakes and 500
//! for everything else. With `expose_error_detail` set the body also carries
//! the full error source chain under `"detail"`.

use crate::settings::Services;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_semantic_core::{IngestError, IngestRequest, SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error as StdError;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
    expose_error_detail: bool,
}

impl AppState {
    pub fn new(services: Arc<Services>, expose_error_detail: bool) -> Self {
        Self {
            services,
            expose_error_detail,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            detail: None,
        }
    }

    fn from_error(status: StatusCode, error: &(dyn StdError + 'static), expose: bool) -> Self {
        Self {
            status,
            message: error.to_string(),
            detail: expose.then(|| error_chain(error)),
        }
    }

    fn from_ingest(error: &IngestError, expose: bool) -> Self {
        let status = if error.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::from_error(status, error, expose)
    }

    fn from_search(error: &SearchError, expose: bool) -> Self {
        let status = if error.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::from_error(status, error, expose)
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self {
            status: error.status(),
            message: error.body_text(),
            detail: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.detail {
            Some(detail) => json!({ "error": self.message, "detail": detail }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub document_id: String,
    pub page_count: usize,
    pub embedded_pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents/upload", post(upload))
        .route("/api/documents/search", post(search))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((bytes.to_vec(), file_name));
            }
            "title" => title = Some(field.text().await?),
            _ => {}
        }
    }

    let (Some((bytes, file_name)), Some(title)) = (file, title) else {
        return Err(ApiError::bad_request("Missing file or title"));
    };

    let report = state
        .services
        .pipeline
        .ingest(IngestRequest {
            bytes,
            title,
            file_name,
        })
        .await
        .map_err(|err| {
            error!(error = %err, "upload failed");
            ApiError::from_ingest(&err, state.expose_error_detail)
        })?;

    info!(document_id = %report.document.id, "upload complete");
    Ok(Json(UploadResponse {
        success: true,
        document_id: report.document.id.clone(),
        page_count: report.document.pages.len(),
        embedded_pages: report.document.embedded_pages(),
    }))
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let query = request.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("Missing query"));
    }

    let results = state
        .services
        .search
        .search_default(&query)
        .await
        .map_err(|err| {
            error!(error = %err, "search failed");
            ApiError::from_search(&err, state.expose_error_detail)
        })?;

    Ok(Json(SearchResponse { results }))
}

pub async fn run_server(
    services: Arc<Services>,
    bind: &str,
    expose_error_detail: bool,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let app = router(AppState::new(services, expose_error_detail), max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
