//! Web endpoints for Paperdock.
//!
//! Upload, list, and delete are guarded by the shared-secret header; the
//! streaming endpoint is open so browser viewers can fetch document bytes
//! directly. Streaming always answers 206 with the range actually served.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth;
use crate::mem;
use crate::range::{chunked_range, resolve_range, ByteRange, RangeError};
use shelf::{BlobDirectory, DocumentName, NameError, RecordStore};

/// Shared state for web handlers
#[derive(Clone)]
pub struct WebState {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<BlobDirectory>,
    /// Shared secret for the CRUD endpoints; `None` disables them.
    pub api_key: Option<String>,
}

/// Largest accepted upload; the axum default of 2 MiB is too small for
/// scanned documents.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn router(state: WebState) -> Router {
    let guarded = Router::new()
        .route(
            "/upload-pdf",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/list-pdf", get(list_documents))
        .route("/delete-pdf/{id}", delete(delete_document))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/stream-pdf/{id}", get(stream_document))
        .route("/memory-usage", get(memory_usage))
        .route("/health", get(health))
        .merge(guarded)
        .with_state(state)
}

/// The full application: routes plus the CORS layer for the viewer origin.
pub fn app(state: WebState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    router(state).layer(cors)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// Serve health and a document count
async fn health(State(state): State<WebState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": state.records.count().unwrap_or(0),
    }))
}

/// Accept a PDF upload and register a record for it.
///
/// Expects a multipart form with a `file` field. The client filename is
/// validated and kept; re-uploading the same name replaces the bytes and
/// adds another record pointing at them.
async fn upload_document(State(state): State<WebState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let Some(filename) = field.file_name().map(str::to_owned) else {
                    return error_response(StatusCode::BAD_REQUEST, "File not found");
                };
                match field.bytes().await {
                    Ok(data) => {
                        upload = Some((filename, data));
                        break;
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            &format!("failed to read upload: {e}"),
                        )
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid multipart body: {e}"),
                )
            }
        }
    }

    let Some((filename, data)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "File not found");
    };

    let name: DocumentName = match filename.parse() {
        Ok(name) => name,
        Err(NameError::NotPdf) => {
            return error_response(StatusCode::BAD_REQUEST, "File must be PDF")
        }
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    if let Err(e) = state.blobs.store(&name, &data) {
        tracing::error!("failed to store document {}: {}", name, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to store document");
    }

    let record = match state.records.insert(name) {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("failed to create record: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to create record");
        }
    };
    if let Err(e) = state.records.flush() {
        tracing::warn!("failed to persist record store: {}", e);
    }

    tracing::info!("stored document {} as id {}", record.filename, record.id);
    (
        StatusCode::OK,
        Json(json!({"id": record.id, "filename": record.filename})),
    )
        .into_response()
}

/// Record summary for list responses
#[derive(Serialize)]
struct DocumentSummary {
    id: u64,
    filename: String,
    created_at: String,
}

/// List all document records
async fn list_documents(State(state): State<WebState>) -> Response {
    match state.records.all() {
        Ok(mut records) => {
            records.sort_by_key(|r| r.id);
            let summaries: Vec<DocumentSummary> = records
                .into_iter()
                .map(|r| DocumentSummary {
                    id: r.id,
                    filename: r.filename.into_inner(),
                    created_at: r.created_at.to_rfc3339(),
                })
                .collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(e) => {
            tracing::error!("failed to list records: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list records")
        }
    }
}

/// Delete a record, and its blob when no other record still needs it
async fn delete_document(State(state): State<WebState>, Path(id): Path<u64>) -> Response {
    let record = match state.records.get(id) {
        Ok(Some(record)) => record,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => {
            tracing::error!("record lookup failed for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "record lookup failed");
        }
    };

    if let Err(e) = state.records.delete(id) {
        tracing::error!("failed to delete record {}: {}", id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to delete record");
    }
    if let Err(e) = state.records.flush() {
        tracing::warn!("failed to persist record store: {}", e);
    }

    // Another record may reference the same filename; keep the blob then.
    let still_referenced = state
        .records
        .all()
        .map(|records| records.iter().any(|r| r.filename == record.filename))
        .unwrap_or(true);
    if !still_referenced {
        if let Err(e) = state.blobs.remove(&record.filename) {
            tracing::warn!("failed to remove document {}: {}", record.filename, e);
        }
    }

    (
        StatusCode::OK,
        Json(json!({"message": "File deleted successfully"})),
    )
        .into_response()
}

/// Stream a document, honoring a `bytes=<start>-<end>` Range header.
///
/// Record and blob existence are settled before the status line is
/// committed; a `Content-Length` cannot be revised once streaming starts.
/// The response is 206 whether or not a Range header was present, with
/// headers describing exactly the interval served.
#[tracing::instrument(name = "http.document.stream", skip(state, headers))]
async fn stream_document(
    State(state): State<WebState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let record = match state.records.get(id) {
        Ok(Some(record)) => record,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => {
            tracing::error!("record lookup failed for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "record lookup failed");
        }
    };

    let file_size = match state.blobs.size(&record.filename) {
        Ok(Some(size)) => size,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => {
            tracing::error!("failed to stat document {}: {}", record.filename, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to stat document");
        }
    };

    if file_size == 0 {
        // No byte of an empty document is addressable; commit to zero bytes
        // with the unsatisfied-range form of Content-Range.
        return (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_RANGE, "bytes */0".to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
                (header::CONTENT_LENGTH, "0".to_string()),
                (header::CONTENT_TYPE, "application/pdf".to_string()),
            ],
        )
            .into_response();
    }

    let range_header = match headers.get(header::RANGE) {
        Some(value) => match value.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "malformed Range header, expected bytes=<start>-<end>",
                )
            }
        },
        None => None,
    };

    let ByteRange { start, end } = match resolve_range(range_header, file_size) {
        Ok(range) => range,
        Err(e @ RangeError::Malformed) => {
            return error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e @ RangeError::Unsatisfiable { .. }) => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
                Json(json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    // Headers must describe the interval actually served; an end past EOF
    // is clipped before being committed.
    let end = end.min(file_size - 1);

    let Some(path) = state.blobs.path(&record.filename) else {
        return error_response(StatusCode::NOT_FOUND, "File not found");
    };
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return error_response(StatusCode::NOT_FOUND, "File not found")
        }
        Err(e) => {
            tracing::error!("failed to open document {}: {}", record.filename, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to open document");
        }
    };

    let body = Body::from_stream(chunked_range(file, start, end));

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}"))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, (end - start + 1).to_string())
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
        .unwrap_or_else(|status| status.into_response())
}

/// Report resident memory, matching the shape the dashboard expects
async fn memory_usage() -> Response {
    match mem::resident_bytes() {
        Ok(bytes) => Json(json!({
            "memory_usage": format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0)),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("memory usage unavailable: {}", e);
            error_response(StatusCode::NOT_IMPLEMENTED, "memory usage unavailable")
        }
    }
}
