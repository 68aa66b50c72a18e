//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video summaries of recurring faces and keywords
//! - Image listing, analysis reset and deletion (admin)
//! - Attachment downloads from R2
//! - Capture session commands
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{AdminCredentials, ApiConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{summarize_video, ImageUrls, SummaryError};
pub use state::AppState;
