//! Image document and visual analysis models.
//!
//! Image documents are frames extracted from a video (linked through `video_id`)
//! or standalone uploads. The analysis record is produced by the vision pipeline
//! and only read here; fields this backend does not interpret are kept in `extra`
//! so documents round-trip unchanged through the API.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::video::VideoId;

/// A number, or a string holding one. Anything else reads as absent.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A string. Anything else reads as absent.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Identifier of an image document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Image document stored in the document store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ImageDocument {
    /// Document ID
    #[serde(default)]
    pub id: ImageId,

    /// Parent video, absent for standalone images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,

    /// Position of the frame in its video, as stored (usually seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_timecode: Option<Value>,

    /// Visual analysis results, absent until the image has been analyzed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImageAnalysis>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ImageDocument {
    /// True if the image is not a frame of any video.
    pub fn is_standalone(&self) -> bool {
        self.video_id.is_none()
    }

    /// True if the vision pipeline has not analyzed this image yet.
    pub fn needs_analysis(&self) -> bool {
        self.analysis.is_none()
    }

    /// Faces detected in this image, empty when not analyzed.
    pub fn faces(&self) -> &[FaceDetection] {
        self.analysis
            .as_ref()
            .and_then(|a| a.face_detection.as_deref())
            .unwrap_or(&[])
    }

    /// Keywords assigned to this image, empty when not analyzed.
    pub fn keywords(&self) -> &[ImageKeyword] {
        self.analysis
            .as_ref()
            .and_then(|a| a.image_keywords.as_deref())
            .unwrap_or(&[])
    }
}

/// Visual analysis attached to an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ImageAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_detection: Option<Vec<FaceDetection>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_keywords: Option<Vec<ImageKeyword>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A face found in an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceDetection {
    /// Recognized person, if the face matched a known identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<FaceIdentity>,

    /// Detection confidence
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Location, age, gender and other detector output
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl FaceDetection {
    /// Name of the recognized person, if any. Empty names count as unrecognized.
    pub fn identity_name(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|i| i.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Confidence of this face, preferring the detection score over the identity score.
    pub fn confidence(&self) -> f64 {
        self.score
            .or_else(|| self.identity.as_ref().and_then(|i| i.score))
            .unwrap_or(0.0)
    }
}

/// Identity assigned to a detected face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FaceIdentity {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A keyword classification of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageKeyword {
    /// Class label
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Classification confidence
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Outcome of removing the analysis from an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReset {
    pub id: ImageId,

    /// Update time of the image after the reset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}
