//! HTTP boundary for exports and book editing

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::export::{ExportArtifact, Exporter};
use crate::models::{BookInput, BookStore, PageInput};
use crate::render;
use crate::{Error, Result};

/// Header carrying the caller's identity.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Books being edited through the API
    pub store: Arc<Mutex<BookStore>>,
    /// Export pipeline with its theme catalog and metadata store
    pub exporter: Exporter,
}

impl AppState {
    pub fn new(exporter: Exporter) -> Self {
        Self {
            store: Arc::new(Mutex::new(BookStore::new())),
            exporter,
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/themes", get(get_themes))
        .route("/api/plan", post(plan))
        .route("/api/export", post(export))
        .route("/api/books", post(create_book))
        .route("/api/books/{id}", get(get_book).delete(delete_book))
        .route("/api/books/{id}/pages", put(replace_pages))
        .route("/api/books/{id}/export", post(export_stored))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| Error::Config(format!("Invalid host address '{}': {}", host, e)))?;
    let addr = SocketAddr::from((host_addr, port));
    let app = router(state);

    println!("Serving bindery API at http://{}", addr);
    println!("Press Ctrl+C to stop");
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Map a library error to a status code and JSON body.
///
/// Server-side failures get `generic` as their message; details go to the log.
fn api_error(err: &Error, generic: &str) -> ApiError {
    let (status, message) = match err {
        e if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        Error::VersionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        _ => {
            tracing::error!(error = %err, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, generic.to_string())
        }
    };
    (status, Json(serde_json::json!({ "error": message })))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> std::result::Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| api_error(&Error::Json(e), "Invalid request"))
}

fn owner(headers: &HeaderMap) -> Option<String> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn pdf_response(artifact: ExportArtifact) -> Response {
    let headers = [
        (header::CONTENT_TYPE, artifact.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        ),
        (header::CONTENT_LENGTH, artifact.content_length.to_string()),
    ];
    (StatusCode::OK, headers, artifact.bytes).into_response()
}

/// Run export work off the async runtime.
async fn run_export<F>(work: F) -> std::result::Result<Response, ApiError>
where
    F: FnOnce() -> Result<ExportArtifact> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(artifact)) => Ok(pdf_response(artifact)),
        Ok(Err(e)) => Err(api_error(&e, "Export failed")),
        Err(e) => {
            tracing::error!(error = %e, "export task failed");
            Err(api_error(&Error::Other(e.to_string()), "Export failed"))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("BINDERY_GIT_COMMIT"),
        "built_at": env!("BINDERY_BUILD_TIMESTAMP")
    }))
}

/// List the loaded themes
async fn get_themes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let themes: Vec<_> = state.exporter.catalog().iter().collect();
    Json(serde_json::json!({ "themes": themes }))
}

/// Lay out a book without printing it
async fn plan(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let input: BookInput = parse_body(&body)?;
    let book = state
        .exporter
        .book_from_input(input)
        .map_err(|e| api_error(&e, "Planning failed"))?;
    let pages = render::plan_book(&book, state.exporter.catalog(), state.exporter.engine());
    Ok(Json(serde_json::json!({
        "book_id": book.id,
        "dimensions": book.dimensions,
        "pages": pages
    })))
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    story_id: Option<String>,
}

/// Export a book record sent in the request body
async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let input: BookInput = parse_body(&body)?;
    let owner = owner(&headers);
    let exporter = state.exporter.clone();
    run_export(move || exporter.export(input, owner.as_deref(), query.story_id.as_deref())).await
}

/// Export a stored book snapshot
async fn export_stored(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
) -> std::result::Result<Response, ApiError> {
    let book = {
        let store = state.store.lock().await;
        store.get(&id).map_err(|e| api_error(&e, "Export failed"))?
    };
    let owner = owner(&headers);
    let exporter = state.exporter.clone();
    run_export(move || exporter.export_book(&book, owner.as_deref(), query.story_id.as_deref()))
        .await
}

/// Create a book
async fn create_book(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut input: BookInput = parse_body(&body)?;
    if input.dimensions.is_none() {
        input.dimensions = Some(state.exporter.default_dimensions().as_str().to_string());
    }
    let mut store = state.store.lock().await;
    let book = store
        .create(input)
        .map_err(|e| api_error(&e, "Create failed"))?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "book": &*book }))))
}

/// Get a book with its pages
async fn get_book(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.lock().await;
    let book = store.get(&id).map_err(|e| api_error(&e, "Lookup failed"))?;
    Ok(Json(serde_json::json!({ "book": &*book })))
}

/// Request body for replacing a book's pages
#[derive(Deserialize)]
struct ReplacePagesRequest {
    version: u64,
    pages: Vec<PageInput>,
}

/// Replace every page of a book
async fn replace_pages(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    body: Bytes,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let request: ReplacePagesRequest = parse_body(&body)?;
    let mut store = state.store.lock().await;
    let book = store
        .replace_pages(&id, request.version, request.pages)
        .map_err(|e| api_error(&e, "Update failed"))?;
    Ok(Json(serde_json::json!({ "book": &*book })))
}

/// Delete a book and its pages
async fn delete_book(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> std::result::Result<StatusCode, ApiError> {
    let mut store = state.store.lock().await;
    store.delete(&id).map_err(|e| api_error(&e, "Delete failed"))?;
    Ok(StatusCode::NO_CONTENT)
}
