//! Video document models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a video document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video document stored in the document store.
///
/// A video owns its frames through the `video_id` back-reference carried by each
/// image document; the video record itself only needs to exist.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoDocument {
    /// Document ID
    #[serde(default)]
    pub id: VideoId,

    /// Remaining stored fields (title, source, thumbnails...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl VideoDocument {
    /// Create a bare video document.
    pub fn new(id: impl Into<VideoId>) -> Self {
        Self {
            id: id.into(),
            extra: HashMap::new(),
        }
    }
}
