//! Multipart image intake shared by the cover and avatar endpoints.

use axum::extract::Multipart;
use chatstory_cloud::StoredFile;
use chatstory_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Largest accepted image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for upload routes: the image plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// An image read from a multipart `file` field.
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Read the `file` field, requiring an `image/*` content type and at most
/// [`MAX_IMAGE_BYTES`]. Other fields are ignored.
pub async fn read_image(mut multipart: Multipart) -> AppResult<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        check_image(&content_type, bytes.len())?;
        return Ok(UploadedImage {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest("Missing required 'file' field".into()))
}

fn check_image(content_type: &str, len: usize) -> AppResult<()> {
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type '{content_type}'. Only images are accepted"
        )));
    }
    if len == 0 {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "Image exceeds the {} MiB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Remove a stored file. Failures are logged, never returned.
pub async fn discard_file(state: &AppState, file_id: Option<String>, owner: &str, owner_id: DbId) {
    let (Some(file_id), Some(storage)) = (file_id, state.storage.as_ref()) else {
        return;
    };
    if let Err(e) = storage.delete(&file_id).await {
        tracing::warn!(
            error = %e,
            provider = storage.name(),
            file_id = %file_id,
            owner,
            owner_id,
            "Failed to delete stored file"
        );
    }
}

/// Pass `result` through, deleting the just-stored file if it is an error.
///
/// Used after an upload succeeded but recording it on the owning row did not.
pub async fn discard_on_error<T>(
    state: &AppState,
    stored: &StoredFile,
    owner: &str,
    owner_id: DbId,
    result: AppResult<T>,
) -> AppResult<T> {
    if result.is_err() {
        tracing::warn!(file_id = %stored.file_id, owner, owner_id, "Discarding orphaned upload");
        discard_file(state, Some(stored.file_id.clone()), owner, owner_id).await;
    }
    result
}

/// Upload through the configured provider, logging what was stored.
pub async fn store(
    state: &AppState,
    name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> AppResult<StoredFile> {
    let storage = state.storage()?;
    let size = bytes.len();
    let stored = storage.upload(name, content_type, bytes).await?;
    tracing::info!(
        provider = storage.name(),
        file_id = %stored.file_id,
        size,
        "File uploaded"
    );
    Ok(stored)
}
