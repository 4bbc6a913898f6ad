//! Attachment upload endpoint.
//!
//! `POST /api/upload?sessionId=<uuid>` with a multipart `file` field.
//! Images are decoded and re-encoded to PNG; PDFs are rendered to one PNG
//! per page. Nothing is written to disk beyond a per-upload scratch
//! directory for PDF rendering — the result lives in the in-memory
//! attachment store, owned by the uploading session, until a generation
//! consumes it or the session ends.

use crate::{api::ApiError, AppState};
use axum::{
    extract::{Extension, Multipart, Query},
    Json,
};
use base64::Engine;
use parlor_types::UserSettings;
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

/// File extensions accepted by the upload endpoint.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "pdf"];

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// What the uploaded bytes actually are, per their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Image,
    Pdf,
}

/// Detects the upload kind from the first bytes of the file. The filename
/// extension is advisory only; content decides.
fn detect_kind(data: &[u8]) -> Option<UploadKind> {
    if data.len() >= 5 && &data[..5] == b"%PDF-" {
        Some(UploadKind::Pdf)
    } else if data.len() >= 8 && data[..8] == [137, 80, 78, 71, 13, 10, 26, 10] {
        Some(UploadKind::Image) // PNG
    } else if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
        Some(UploadKind::Image) // JPEG
    } else if data.len() >= 4 && &data[..4] == b"GIF8" {
        Some(UploadKind::Image)
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(UploadKind::Image)
    } else {
        None
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

async fn load_settings(state: &Arc<AppState>) -> Result<UserSettings, ApiError> {
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        parlor_db::load_settings(&conn)
            .map_err(|e| ApiError::InternalServerError(format!("failed to load settings: {}", e)))
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}

/// Handler for `POST /api/upload`.
pub async fn upload_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session_id = Uuid::parse_str(&params.session_id)
        .map_err(|_| ApiError::BadRequest("invalid session id".to_string()))?;

    if !state.sessions.exists(session_id).await {
        return Err(ApiError::BadRequest(
            "unknown session; connect before uploading".to_string(),
        ));
    }

    // Extract the file field from multipart
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
        .ok_or_else(|| ApiError::BadRequest("no file part in the request".to_string()))?;

    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("no selected file".to_string()))?;

    let extension = extension_of(&filename).ok_or_else(|| {
        ApiError::BadRequest(format!("File '{filename}' has no recognizable extension."))
    })?;
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "File type '{extension}' not allowed."
        )));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;

    let settings = load_settings(&state).await?;
    let max_bytes = settings.upload.max_file_mb as usize * 1024 * 1024;
    if data.len() > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File is too large. The current maximum upload size is {} MB.",
            settings.upload.max_file_mb
        )));
    }

    let kind = detect_kind(&data).ok_or_else(|| {
        ApiError::BadRequest(format!("File '{filename}' is not a supported image or PDF."))
    })?;

    let pages = match kind {
        UploadKind::Image => vec![reencode_image_png(data.to_vec()).await?],
        UploadKind::Pdf => {
            render_pdf_pages(
                &state,
                &filename,
                &data,
                settings.upload.max_pdf_pages,
                settings.upload.pdf_render_scale,
            )
            .await?
        }
    };

    let page_count = pages.len();
    let encoded: Vec<String> = pages
        .into_iter()
        .map(|page| base64::engine::general_purpose::STANDARD.encode(page))
        .collect();

    let file_id = state.attachments.insert(session_id, encoded);

    tracing::info!(
        session_id = %session_id,
        file_id = %file_id,
        filename = %filename,
        pages = page_count,
        "stored uploaded attachment"
    );

    Ok(Json(serde_json::json!({
        "fileId": file_id,
        "pages": page_count,
    })))
}

/// Decodes an image and re-encodes it as PNG on a blocking thread.
async fn reencode_image_png(data: Vec<u8>) -> Result<Vec<u8>, ApiError> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&data)
            .map_err(|_| ApiError::BadRequest("Invalid or corrupt image file.".to_string()))?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| ApiError::InternalServerError(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer.into_inner())
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}

/// Probes the page count and renders every page to PNG in a per-upload
/// scratch directory.
async fn render_pdf_pages(
    state: &Arc<AppState>,
    filename: &str,
    data: &[u8],
    max_pages: u32,
    scale: f32,
) -> Result<Vec<Vec<u8>>, ApiError> {
    let scratch = tempfile::tempdir()
        .map_err(|e| ApiError::InternalServerError(format!("failed to create scratch dir: {}", e)))?;
    let pdf_path = scratch.path().join("upload.pdf");

    tokio::fs::write(&pdf_path, data)
        .await
        .map_err(|e| ApiError::InternalServerError(format!("failed to write scratch file: {}", e)))?;

    let pages = state
        .pdf
        .page_count(&pdf_path)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process PDF file '{filename}': {e}")))?;

    if pages > max_pages {
        return Err(ApiError::BadRequest(format!(
            "PDF '{filename}' has {pages} pages. The limit is {max_pages} pages."
        )));
    }

    tracing::info!(filename = %filename, pages, "rendering PDF pages to images");

    state
        .pdf
        .render_pages(&pdf_path, scale)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process PDF file '{filename}': {e}")))
}
