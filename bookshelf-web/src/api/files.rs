//! JSON upload and artifact browsing endpoints

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use bookshelf_common::import::ImportOutcome;
use bookshelf_common::upload::validate_upload;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File is too large (max 5 MB).".to_string())
    } else {
        ApiError::BadRequest(format!("Malformed upload: {}", e.body_text()))
    }
}

/// POST /api/upload
///
/// Multipart form with an optional `title` and a required `file`. The file
/// name and size are checked first; accepted files are stored under a
/// generated name and kept only if they hold book-shaped JSON.
pub async fn upload_json(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, bytes));
            }
            _ => {}
        }
    }

    let accepted = validate_upload(
        title.as_deref(),
        file.as_ref().map(|(name, bytes)| (name.as_str(), bytes.len())),
    )?;
    let content = file.map(|(_, bytes)| bytes).unwrap_or_default();

    match state.imports.import(&accepted, &content).await? {
        ImportOutcome::Accepted(info) => {
            info!("Upload {:?} stored as {}", accepted.display_name, info.filename);
            Ok(Json(json!({
                "status": "ok",
                "message": format!("File \"{}\" uploaded successfully.", accepted.display_name),
                "file": info,
            })))
        }
        ImportOutcome::Rejected(reason) => {
            warn!("Upload {:?} rejected: {}", accepted.original_name, reason);
            Err(ApiError::BadRequest(format!(
                "File is invalid and was deleted: {}",
                reason
            )))
        }
    }
}

/// GET /api/files
///
/// Uploaded artifacts with their sizes, sorted by name.
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let files = state.storage.list_artifacts().await?;

    let empty = files.is_empty();
    let mut body = json!({ "count": files.len(), "files": files });
    if empty {
        body["message"] = json!("No JSON files found.");
    }
    Ok(Json(body))
}

/// GET /api/files/:filename
///
/// Items of one artifact; a single object comes back as a one-item list.
pub async fn view_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
    let items = state.storage.read_artifact(&filename).await?;

    Ok(Json(json!({
        "filename": filename,
        "count": items.len(),
        "items": items,
    })))
}
