//! Capture session command handlers.

use axum::Json;
use chrono::Utc;
use tracing::info;
use vision_models::{SessionCommand, StartSessionRequest, StopSessionRequest};

use crate::error::{ApiError, ApiResult};

/// Build a start-session command.
pub async fn start_session(Json(request): Json<StartSessionRequest>) -> ApiResult<Json<SessionCommand>> {
    let command = SessionCommand::start(request, Utc::now().timestamp_millis())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(session_id = command.session_id(), "Built start session command");
    Ok(Json(command))
}

/// Build a stop-session command.
pub async fn stop_session(Json(request): Json<StopSessionRequest>) -> Json<SessionCommand> {
    let command = SessionCommand::stop(request);
    info!(session_id = command.session_id(), "Built stop session command");
    Json(command)
}
