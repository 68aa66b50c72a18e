//! Processing status handler.

use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

/// Image counters for dashboards. Always succeeds and may be read from any origin.
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.catalog.processing_status().await;

    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Origin, X-Requested-With, Content-Type, Accept"),
            ),
        ],
        Json(status),
    )
}
