use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use imgcut_core::FileRecord;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info};

use super::run_blocking;
use crate::middleware::CurrentSession;
use crate::state::AppState;
use crate::utils::error::ApiError;

const UPLOAD_FIELD: &str = "uploadingFile";
const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    /// Key to send back as `fileName` for cut, download and delete
    pub file_name: String,
    pub display_name: String,
    pub has_archive: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecord> for FileView {
    fn from(record: FileRecord) -> Self {
        Self {
            file_name: record.original_path.to_string_lossy().into_owned(),
            display_name: base_name(&record.original_path),
            has_archive: record.archive_path.is_some(),
            uploaded_at: record.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutResponse {
    pub success: bool,
    pub file_name: String,
    pub archive: String,
}

#[derive(Debug, Deserialize)]
pub struct CutForm {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "dX")]
    pub dx: String,
    #[serde(rename = "dY")]
    pub dy: String,
}

#[derive(Debug, Deserialize)]
pub struct FileForm {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub async fn list_files(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<FileView>>, ApiError> {
    let files = state.files.clone();
    let records = run_blocking(move || files.get_files(&session)).await?;
    Ok(Json(records.into_iter().map(FileView::from).collect()))
}

pub async fn upload_file(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "file must be JPEG or PNG, got {:?}",
                content_type
            )));
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::BadRequest("filename required".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;

        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest(format!("{} required", UPLOAD_FIELD)))?;
    info!("uploading {} ({} bytes)", file_name, data.len());

    let files = state.files.clone();
    let stored = run_blocking(move || files.upload_file(&session, &data[..], &file_name)).await?;

    Ok(Json(UploadResponse {
        success: true,
        file_name: stored.to_string_lossy().into_owned(),
    }))
}

pub async fn cut_file(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<CutForm>,
) -> Result<Json<CutResponse>, ApiError> {
    let dx = parse_dimension("dX", &form.dx)?;
    let dy = parse_dimension("dY", &form.dy)?;
    info!("fileName: {}, dX: {}, dY: {}", form.file_name, dx, dy);

    let files = state.files.clone();
    let file_name = form.file_name.clone();
    let archive = run_blocking(move || files.cut_file(&session, &file_name, dx, dy)).await?;

    Ok(Json(CutResponse {
        success: true,
        file_name: form.file_name,
        archive: base_name(&archive),
    }))
}

pub async fn download_archive(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<FileForm>,
) -> Result<Response, ApiError> {
    info!("downloading archive of: {}", form.file_name);

    let files = state.files.clone();
    let file_name = form.file_name;
    let archive = run_blocking(move || files.get_archive_name(&session, &file_name)).await?;

    let body = read_archive(&archive).await?;

    let disposition = format!("attachment; filename={:?}", base_name(&archive));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<FileForm>,
) -> Result<StatusCode, ApiError> {
    let files = state.files.clone();
    let file_name = form.file_name;
    run_blocking(move || files.delete_file(&session, &file_name)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The session lock is released by now, so a concurrent delete can still
/// remove the archive.
async fn read_archive(archive: &Path) -> Result<Vec<u8>, ApiError> {
    tokio::fs::read(archive).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            ApiError::NotFound(format!("archive {} no longer exists", base_name(archive)))
        }
        _ => {
            error!("error reading archive {}: {}", archive.display(), e);
            ApiError::InternalError("Failed to read archive".to_string())
        }
    })
}

fn parse_dimension(field: &str, raw: &str) -> Result<u32, ApiError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ApiError::BadRequest(format!("{} must be a positive integer", field)))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("dX", "250").unwrap(), 250);
        assert_eq!(parse_dimension("dX", " 32 ").unwrap(), 32);
        assert!(parse_dimension("dX", "dvesti").is_err());
        assert!(parse_dimension("dX", "-5").is_err());
        assert!(parse_dimension("dX", "").is_err());
    }

    #[tokio::test]
    async fn test_read_archive_deleted_meanwhile() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("photo.zip");
        std::fs::write(&archive, b"zip").unwrap();
        assert_eq!(read_archive(&archive).await.unwrap(), b"zip");

        std::fs::remove_file(&archive).unwrap();
        let response = read_archive(&archive).await.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // anything else is still a server error
        let response = read_archive(dir.path()).await.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_file_view_from_record() {
        let mut record = FileRecord::new("temp/abc/photo.jpg".into());
        let view = FileView::from(record.clone());
        assert_eq!(view.file_name, "temp/abc/photo.jpg");
        assert_eq!(view.display_name, "photo.jpg");
        assert!(!view.has_archive);

        record.archive_path = Some("temp/abc/photo.zip".into());
        assert!(FileView::from(record).has_archive);
    }
}
