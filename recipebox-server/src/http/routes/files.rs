//! File upload endpoints
//!
//! Bytes go to the object store under `<uuid>-<sanitized name>`; the row
//! records the key and a signed download URL.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::db::FileRecord;
use crate::http::error::ApiError;
use crate::http::extractors::{ApiPath, CurrentUser};
use crate::http::server::{AppState, MAX_UPLOAD_BYTES};
use crate::storage::{needs_refresh, object_key};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// File response
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub url_expiry: String,
}

impl From<FileRecord> for FileResponse {
    fn from(f: FileRecord) -> Self {
        Self {
            id: f.id,
            name: f.name,
            url: f.url,
            url_expiry: f.url_expiry.to_rfc3339(),
        }
    }
}

/// POST /api/file - multipart upload (field `file`)
async fn upload_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let (filename, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
            .ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        break (filename, bytes);
    };

    if bytes.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let key = object_key(&filename);
    let signed = state.signer.sign(&key, Utc::now())?;
    state.store.put(&key, &bytes).await?;

    let file = match state
        .files()
        .create(user.id, &key, &signed.url, signed.expires_at)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            // Don't leave an orphaned object behind
            if let Err(cleanup) = state.store.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "failed to remove orphaned object");
            }
            return Err(e.into());
        }
    };

    tracing::info!(file_id = file.id, user_id = user.id, size = bytes.len(), "file uploaded");
    Ok((StatusCode::CREATED, Json(file.into())))
}

/// GET /api/file/{id} - re-signs the URL when it is about to expire
async fn get_file(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<FileResponse>, ApiError> {
    let file = state.files().get(id).await?;

    let now = Utc::now();
    if !needs_refresh(file.url_expiry, now) {
        return Ok(Json(file.into()));
    }

    let signed = state.signer.sign(&file.name, now)?;
    let file = state
        .files()
        .update_url(file.id, &signed.url, signed.expires_at)
        .await?;
    tracing::debug!(file_id = file.id, "file URL re-signed");
    Ok(Json(file.into()))
}

/// File routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/file",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/file/{id}", get(get_file))
}
