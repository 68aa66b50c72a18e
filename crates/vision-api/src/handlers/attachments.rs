//! Attachment download handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const ATTACHMENT_EXTENSION: &str = ".jpg";

/// Serve attachment `{kind}.jpg` of a document, e.g. `/images/image/{id}.jpg`
/// for an uploaded image or `/images/thumbnail/{id}.jpg` for a video thumbnail.
pub async fn get_attachment(
    State(state): State<AppState>,
    Path((kind, file)): Path<(String, String)>,
) -> ApiResult<Response> {
    let doc_id = file
        .strip_suffix(ATTACHMENT_EXTENSION)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::not_found(format!("Attachment {}", file)))?;
    let name = format!("{}{}", kind, ATTACHMENT_EXTENSION);

    let attachment = state
        .attachments
        .get_attachment(doc_id, &name)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::not_found(format!("Attachment {}/{}", doc_id, name))
            } else {
                ApiError::from(e)
            }
        })?;

    metrics::record_attachment_served(&kind, attachment.bytes.len());

    let content_type = HeaderValue::from_str(&attachment.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, attachment.bytes.len())
        .body(Body::from(attachment.bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}
