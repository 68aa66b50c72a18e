//! Video API handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use vision_models::{VideoId, VideoSummary};

use crate::error::ApiResult;
use crate::services::{summarize_video, ImageUrls};
use crate::state::AppState;

/// Summary of the people and keywords recurring in a video.
pub async fn get_video_summary(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<VideoSummary>> {
    let urls = ImageUrls::for_request(&state.config, &headers);
    let summary = summarize_video(
        state.catalog.as_ref(),
        &VideoId::from(video_id),
        &state.config.summary,
        &urls,
    )
    .await?;

    Ok(Json(summary))
}
