//! Business logic services.

pub mod summary;

pub use summary::{summarize_video, ImageUrls, SummaryError};
