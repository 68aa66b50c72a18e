//! Image API handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use vision_models::{AnalysisReset, ImageDocument, ImageId};

use crate::auth::AdminGuard;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// List images that do not belong to a video.
pub async fn list_standalone_images(State(state): State<AppState>) -> ApiResult<Json<Vec<ImageDocument>>> {
    Ok(Json(state.catalog.standalone_images().await?))
}

/// Remove the analysis of an image so the pipeline processes it again.
pub async fn reset_image_analysis(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    admin: AdminGuard,
) -> ApiResult<Json<AnalysisReset>> {
    let image_id = ImageId::from(image_id);

    let reset = state
        .catalog
        .reset_analysis(&image_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Image {}", image_id)))?;

    info!(image_id = %image_id, user = ?admin.username, "Reset image analysis");
    Ok(Json(reset))
}

/// Image deletion response.
#[derive(Serialize)]
pub struct DeleteImageResponse {
    pub id: ImageId,
    pub deleted: bool,
    pub attachments_deleted: u32,
}

/// Delete an image and, best effort, its attachments.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    admin: AdminGuard,
) -> ApiResult<Json<DeleteImageResponse>> {
    let image_id = ImageId::from(image_id);

    if !state.catalog.delete_image(&image_id).await? {
        return Err(ApiError::not_found(format!("Image {}", image_id)));
    }

    let attachments_deleted = match state.attachments.delete_attachments(image_id.as_str()).await {
        Ok(count) => count,
        Err(e) => {
            warn!(image_id = %image_id, "Failed to delete attachments: {}", e);
            0
        }
    };

    info!(
        image_id = %image_id,
        user = ?admin.username,
        attachments_deleted,
        "Deleted image"
    );

    Ok(Json(DeleteImageResponse {
        id: image_id,
        deleted: true,
        attachments_deleted,
    }))
}
