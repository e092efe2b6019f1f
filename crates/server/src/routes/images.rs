//! Listing image upload.
//!
//! Accepts one multipart file field, validates type and size, stores it
//! under a fresh key, and returns both the relative key (what the listing
//! should store) and the resolved public URL (what to render immediately).

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Maximum accepted image size (5 MiB, matching the storage bucket policy).
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Relative key to store on the listing.
    pub key: String,
    /// Resolved public URL for immediate display.
    pub url: String,
}

/// Upload a listing image.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
        .ok_or_else(|| AppError::BadRequest("missing file field".into()))?;

    let content_type = field
        .content_type()
        .map(ToOwned::to_owned)
        .ok_or_else(|| AppError::BadRequest("missing content type".into()))?;
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "unsupported content type: {content_type}"
        )));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("empty file".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "file exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }

    let extension = match content_type.as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    };
    // Key namespaced by uploader so sellers cannot collide with each other.
    let key = format!(
        "{}/{}.{extension}",
        principal.id,
        tackroom_core::new_uuid()
    );

    state
        .storage()
        .upload(&key, bytes.to_vec(), &content_type)
        .await?;

    let url = state.storage().public_url(&key);
    Ok((StatusCode::CREATED, Json(UploadResponse { key, url })))
}
