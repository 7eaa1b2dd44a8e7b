//! Image upload route handler.
//!
//! Accepts base64 image data, pushes it to ImgBB, and hands back the hosted
//! URL for use in product listings.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Request body for `POST /api/uploads/images`. Accepts bare base64 or a
/// full `data:image/...;base64,` URI.
#[derive(Deserialize)]
pub struct UploadImageRequest {
    pub image_base64: String,
}

impl std::fmt::Debug for UploadImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadImageRequest")
            .field("image_base64_len", &self.image_base64.len())
            .finish()
    }
}

/// Hosted image URL.
#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub url: String,
}

/// Upload an image to the configured host.
///
/// `POST /api/uploads/images`
///
/// # Errors
///
/// Returns 400 for empty data, 502 when the host rejects the upload, 503
/// when no image host is configured.
#[instrument(skip(state, request))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireUser(_current): RequireUser,
    Json(request): Json<UploadImageRequest>,
) -> Result<Json<UploadImageResponse>, AppError> {
    if request.image_base64.trim().is_empty() {
        return Err(AppError::BadRequest("image_base64 is required".to_string()));
    }
    let imgbb = state
        .imgbb()
        .ok_or_else(|| AppError::Unavailable("image hosting is not configured".to_string()))?;

    let url = imgbb.upload(&request.image_base64).await?;
    Ok(Json(UploadImageResponse { url }))
}
