//! Session control commands.
//!
//! Commands are plain JSON messages consumed by the capture device; building
//! them has no side effects. A start command needs a capture strategy and takes
//! its session id from the caller or, failing that, from the current time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a session command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Missing capture strategy")]
    MissingStrategy,
}

/// Request to start a capture session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub session_id: Option<i64>,
}

/// Request to stop a capture session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopSessionRequest {
    pub session_id: i64,
}

/// Command sent to the capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SessionCommand {
    #[serde(rename_all = "camelCase")]
    StartSession { session_id: i64, strategy: String },
    #[serde(rename_all = "camelCase")]
    StopSession { session_id: i64 },
}

impl SessionCommand {
    /// Build a start command. `now_millis` is used when no session id is given.
    pub fn start(request: StartSessionRequest, now_millis: i64) -> Result<Self, SessionError> {
        let strategy = request.strategy.ok_or(SessionError::MissingStrategy)?;

        Ok(Self::StartSession {
            session_id: request.session_id.unwrap_or(now_millis),
            strategy,
        })
    }

    /// Build a stop command.
    pub fn stop(request: StopSessionRequest) -> Self {
        Self::StopSession {
            session_id: request.session_id,
        }
    }

    pub fn session_id(&self) -> i64 {
        match self {
            Self::StartSession { session_id, .. } | Self::StopSession { session_id } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_with_session_id() {
        let request: StartSessionRequest =
            serde_json::from_value(json!({"strategy": "follow", "sessionId": 42})).unwrap();
        let command = SessionCommand::start(request, 1_000).unwrap();

        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"command": "startSession", "sessionId": 42, "strategy": "follow"})
        );
    }

    #[test]
    fn test_start_defaults_session_id_to_now() {
        let request = StartSessionRequest {
            strategy: Some("patrol".into()),
            session_id: None,
        };
        let command = SessionCommand::start(request, 1_700_000_000_000).unwrap();

        assert_eq!(command.session_id(), 1_700_000_000_000);
    }

    #[test]
    fn test_start_requires_strategy() {
        let result = SessionCommand::start(StartSessionRequest::default(), 1);
        assert_eq!(result, Err(SessionError::MissingStrategy));
    }

    #[test]
    fn test_stop() {
        let request: StopSessionRequest = serde_json::from_value(json!({"sessionId": 7})).unwrap();

        assert_eq!(
            serde_json::to_value(SessionCommand::stop(request)).unwrap(),
            json!({"command": "stopSession", "sessionId": 7})
        );
    }
}
