//! Video summary service.
//!
//! Loads a video and its frames from the catalog and reduces their analysis
//! to a [`VideoSummary`]. The reduction itself lives in `vision_models`.

use axum::http::{header, HeaderMap};
use thiserror::Error;
use tracing::info;
use vision_firestore::{FirestoreError, MediaCatalog};
use vision_models::{summarize, ImageId, SummaryConfig, VideoId, VideoSummary};

use crate::config::ApiConfig;
use crate::metrics;

/// Errors producing a video summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("Failed to load video data: {0}")]
    Store(#[from] FirestoreError),
}

/// Builds public image URLs: `{base}/images/image/{id}.jpg`.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Base from configuration, else from the request's Host and X-Forwarded-Proto.
    pub fn for_request(config: &ApiConfig, headers: &HeaderMap) -> Self {
        if let Some(base) = &config.public_base_url {
            return Self::new(base.clone());
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("X-Forwarded-Proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|p| p.eq_ignore_ascii_case("https"))
            .map_or("http", |_| "https");

        Self::new(format!("{}://{}", scheme, host))
    }

    pub fn image_url(&self, image_id: &ImageId) -> String {
        format!(
            "{}/images/image/{}.jpg",
            self.base,
            urlencoding::encode(image_id.as_str())
        )
    }
}

/// Summarize the frames of a video.
pub async fn summarize_video(
    catalog: &dyn MediaCatalog,
    video_id: &VideoId,
    config: &SummaryConfig,
    urls: &ImageUrls,
) -> Result<VideoSummary, SummaryError> {
    if catalog.get_video(video_id).await?.is_none() {
        return Err(SummaryError::VideoNotFound(video_id.clone()));
    }

    let images = catalog.images_for_video(video_id).await?;
    let summary = summarize(&images, config, |id| urls.image_url(id));

    metrics::record_summary(&summary);
    info!(
        video_id = %video_id,
        frames = images.len(),
        faces = summary.face_detection.len(),
        keywords = summary.image_keywords.len(),
        "Computed video summary"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_image_url() {
        let urls = ImageUrls::new("http://localhost:8000/");
        assert_eq!(
            urls.image_url(&ImageId::from("frame-1")),
            "http://localhost:8000/images/image/frame-1.jpg"
        );
        assert_eq!(
            urls.image_url(&ImageId::from("a b")),
            "http://localhost:8000/images/image/a%20b.jpg"
        );
    }

    #[test]
    fn test_base_from_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("vision.local:3000"));
        let urls = ImageUrls::for_request(&ApiConfig::default(), &headers);
        assert_eq!(urls.image_url(&ImageId::from("x")), "http://vision.local:3000/images/image/x.jpg");

        headers.insert("X-Forwarded-Proto", HeaderValue::from_static("https, http"));
        let urls = ImageUrls::for_request(&ApiConfig::default(), &headers);
        assert_eq!(urls.image_url(&ImageId::from("x")), "https://vision.local:3000/images/image/x.jpg");
    }

    #[test]
    fn test_configured_base_wins() {
        let config = ApiConfig {
            public_base_url: Some("https://cdn.example.com".into()),
            ..ApiConfig::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8000"));

        let urls = ImageUrls::for_request(&config, &headers);
        assert_eq!(urls.image_url(&ImageId::from("x")), "https://cdn.example.com/images/image/x.jpg");
    }
}
