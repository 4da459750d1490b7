//! API handlers for the pdfedit server
//!
//! Provides REST endpoints for:
//! - Text layout extraction and coordinate patching (the editor)
//! - Editing session management
//! - Page tools: merge, split, remove, rotate, reorder, crop
//! - Metadata editing and plain-text export

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use pdfedit_core::{DocumentLayout, Margins, MetadataUpdate, Patch};

use crate::error::ServerError;
use crate::AppState;

/// Producer written by `/edit-metadata`.
const PRODUCER: &str = "pdfedit-server";
/// Stamp used by `/watermark` when no `text` is given
const DEFAULT_WATERMARK: &str = "WATERMARK";

const PDF_MIME: &str = "application/pdf";
const TEXT_MIME: &str = "text/plain; charset=utf-8";

// ============================================================================
// Multipart uploads
// ============================================================================

/// A file part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// All parts of a multipart upload, files and plain fields
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<(String, UploadedFile)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    debug!(field = %name, file_name = %file_name, size = data.len(), "Received file");
                    form.files.push((name, UploadedFile { file_name, data }));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// The PDF uploaded under `name`; missing or non-PDF is `InvalidFile`.
    pub fn pdf(&self, name: &str) -> Result<&UploadedFile, ServerError> {
        self.files
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, file)| file)
            .filter(|file| file.is_pdf())
            .ok_or(ServerError::InvalidFile)
    }

    /// Every PDF uploaded under `name`, in upload order; other files are skipped.
    pub fn pdfs(&self, name: &str) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|(field, file)| field == name && file.is_pdf())
            .map(|(_, file)| file)
            .collect()
    }

    /// Trimmed text field, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(|v| v.trim()).unwrap_or("")
    }

    /// Numeric field, `default` when absent or blank.
    pub fn number<T: FromStr>(&self, name: &str, default: T) -> Result<T, ServerError> {
        let value = self.text(name);
        if value.is_empty() {
            return Ok(default);
        }
        value
            .parse()
            .map_err(|_| ServerError::InvalidRequest(format!("Invalid {}: '{}'", name, value)))
    }
}

/// Run CPU-bound PDF work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, pdfedit_core::PdfEditError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("PDF task panicked: {}", e)))?
        .map_err(ServerError::from)
}

fn attachment(body: Vec<u8>, file_name: &str, content_type: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

fn parse_session_id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServerError::DocumentNotFound(raw.to_string()))
}

// ============================================================================
// Health
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub sessions: usize,
}

/// Handler: GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfedit-server",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.count().await,
    })
}

// ============================================================================
// Editor
// ============================================================================

/// Layout of an uploaded document plus the session that now holds it
#[derive(Serialize)]
pub struct LayoutResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub layout: DocumentLayout,
}

/// Handler: POST /get-pdf-text
pub async fn handle_get_pdf_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<LayoutResponse>, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.pdf("file")?.clone();

    let data = file.data.clone();
    let layout = run_blocking(move || pdfedit_core::extract_layout(&data)).await?;
    info!(
        "Extracted layout: file={}, pages={}",
        file.file_name, layout.total_pages
    );

    let session = state.sessions.create(file.file_name, file.data).await?;

    Ok(Json(LayoutResponse {
        success: true,
        session_id: session.id,
        expires_at: session.expires_at,
        layout,
    }))
}

/// Body of POST /edit-pdf
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub edits: Vec<Patch>,
}

/// Handler: POST /edit-pdf
pub async fn handle_edit_pdf(
    State(state): State<AppState>,
    body: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(req) = body.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let id = parse_session_id(req.session_id.as_deref().unwrap_or(""))?;

    let (_edit_guard, session) = state.sessions.begin_edit(id).await?;
    debug!(session_id = %id, edits = req.edits.len(), "Edit request");

    let document = session.document.clone();
    let edits = req.edits;
    let report = run_blocking(move || pdfedit_core::apply_patches(&document, &edits)).await?;

    info!(
        session_id = %id,
        applied = report.applied,
        skipped = report.skipped.len(),
        "Applied patches"
    );

    let bytes = report.bytes;
    state
        .sessions
        .replace_document(id, Bytes::from(bytes.clone()))
        .await?;

    let mut response = attachment(bytes, "edited.pdf", PDF_MIME);
    let headers = response.headers_mut();
    headers.insert("x-patches-applied", report.applied.into());
    headers.insert("x-patches-skipped", report.skipped.len().into());
    Ok(response)
}

// ============================================================================
// Sessions
// ============================================================================

/// Session details without the document itself
#[derive(Serialize)]
pub struct SessionInfo {
    pub success: bool,
    pub session_id: Uuid,
    pub file_name: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Handler: GET /sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ServerError> {
    let session = state.sessions.get(parse_session_id(&id)?).await?;
    Ok(Json(SessionInfo {
        success: true,
        session_id: session.id,
        file_name: session.file_name,
        size: session.document.len(),
        created_at: session.created_at,
        updated_at: session.updated_at,
        expires_at: session.expires_at,
    }))
}

/// Handler: DELETE /sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.sessions.remove(parse_session_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Page tools
// ============================================================================

/// Handler: POST /merge
pub async fn handle_merge(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let documents: Vec<Vec<u8>> = form
        .pdfs("files")
        .into_iter()
        .map(|file| file.data.to_vec())
        .collect();

    if documents.len() < 2 {
        return Err(ServerError::InvalidRequest(
            "Please upload at least 2 PDF files".to_string(),
        ));
    }

    info!("Merging {} documents", documents.len());
    let merged = run_blocking(move || pdfedit_core::merge_documents(&documents)).await?;
    Ok(attachment(merged, "merged.pdf", PDF_MIME))
}

/// Handler: POST /split
pub async fn handle_split(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let pages = form.text("pages").to_string();

    debug!("Split request: pages='{}'", pages);
    let out = run_blocking(move || pdfedit_core::split_document(&data, &pages)).await?;
    Ok(attachment(out, "split.pdf", PDF_MIME))
}

/// Handler: POST /remove-pages
pub async fn handle_remove_pages(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let pages = form.text("pages").to_string();

    debug!("Remove request: pages='{}'", pages);
    let out = run_blocking(move || pdfedit_core::remove_pages(&data, &pages)).await?;
    Ok(attachment(out, "removed_pages.pdf", PDF_MIME))
}

/// Handler: POST /rotate-pdf
pub async fn handle_rotate(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let rotation: i64 = form.number("rotation", 90)?;

    debug!("Rotate request: rotation={}", rotation);
    let out = run_blocking(move || pdfedit_core::rotate_pages(&data, rotation)).await?;
    Ok(attachment(out, "rotated.pdf", PDF_MIME))
}

/// Handler: POST /reorder-pdf
pub async fn handle_reorder(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let order = form.text("order").to_string();

    debug!("Reorder request: order='{}'", order);
    let out = run_blocking(move || pdfedit_core::reorder_pages(&data, &order)).await?;
    Ok(attachment(out, "reordered.pdf", PDF_MIME))
}

/// Handler: POST /crop-pdf
pub async fn handle_crop(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let margins = Margins {
        top: form.number("top", 0.0)?,
        bottom: form.number("bottom", 0.0)?,
        left: form.number("left", 0.0)?,
        right: form.number("right", 0.0)?,
    };

    debug!("Crop request: {:?}", margins);
    let out = run_blocking(move || pdfedit_core::crop_pages(&data, margins)).await?;
    Ok(attachment(out, "cropped.pdf", PDF_MIME))
}

/// Handler: POST /edit-metadata
pub async fn handle_edit_metadata(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let update = MetadataUpdate {
        title: form.text("title").to_string(),
        author: form.text("author").to_string(),
        producer: PRODUCER.to_string(),
    };

    let out = run_blocking(move || pdfedit_core::edit_metadata(&data, &update)).await?;
    Ok(attachment(out, "metadata_edited.pdf", PDF_MIME))
}

pub async fn handle_compress(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();

    let out = run_blocking(move || pdfedit_core::compress_document(&data)).await?;
    Ok(attachment(out, "compressed.pdf", PDF_MIME))
}

pub async fn handle_watermark(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();
    let text = match form.text("text") {
        "" => DEFAULT_WATERMARK.to_string(),
        text => text.to_string(),
    };
    debug!("Watermark request: text='{}'", text);

    let out = run_blocking(move || pdfedit_core::watermark_pages(&data, &text)).await?;
    Ok(attachment(out, "watermarked.pdf", PDF_MIME))
}

/// Handler: POST /pdf-to-text
pub async fn handle_pdf_to_text(multipart: Multipart) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let data = form.pdf("file")?.data.clone();

    let text = run_blocking(move || pdfedit_core::extract_text(&data)).await?;
    Ok(attachment(text.into_bytes(), "pdf_text.txt", TEXT_MIME))
}
