//! Shared data models for the vision backend.
//!
//! This crate provides Serde-serializable types for:
//! - Image and video documents with their visual analysis
//! - Video summaries (occurrence grouping, filtering and ranking)
//! - Processing status counters
//! - Session control commands

pub mod image;
pub mod session;
pub mod status;
pub mod summary;
pub mod video;

// Re-export common types
pub use image::{AnalysisReset, FaceDetection, FaceIdentity, ImageAnalysis, ImageDocument, ImageId, ImageKeyword};
pub use session::{SessionCommand, SessionError, StartSessionRequest, StopSessionRequest};
pub use status::{ImageCounts, ProcessingStatus};
pub use summary::{
    collect_occurrences, summarize, Occurrence, OccurrenceIndex, OccurrenceKey,
    OccurrenceThresholds, RankedOccurrences, SummaryConfig, VideoSummary,
};
pub use video::{VideoDocument, VideoId};
