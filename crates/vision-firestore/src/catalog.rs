//! Media catalog: the document-store operations the API needs.

use async_trait::async_trait;
use tracing::warn;
use vision_models::{AnalysisReset, ImageDocument, ImageId, ProcessingStatus, VideoDocument, VideoId};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::repos::{ImageRepository, VideoRepository};

/// Read and maintenance access to stored images and videos.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn get_video(&self, video_id: &VideoId) -> FirestoreResult<Option<VideoDocument>>;

    /// Frames of a video, in a stable order.
    async fn images_for_video(&self, video_id: &VideoId) -> FirestoreResult<Vec<ImageDocument>>;

    /// Images that are not frames of any video.
    async fn standalone_images(&self) -> FirestoreResult<Vec<ImageDocument>>;

    /// Remove the analysis of an image, `None` if it does not exist.
    async fn reset_analysis(&self, image_id: &ImageId) -> FirestoreResult<Option<AnalysisReset>>;

    /// Delete an image, `false` if it does not exist.
    async fn delete_image(&self, image_id: &ImageId) -> FirestoreResult<bool>;

    /// Image counters. Never fails; counters that cannot be computed are left out.
    async fn processing_status(&self) -> ProcessingStatus;

    async fn check_connectivity(&self) -> FirestoreResult<()>;
}

/// Collection names used by the catalog.
#[derive(Debug, Clone)]
pub struct CatalogCollections {
    pub images: String,
    pub videos: String,
}

impl Default for CatalogCollections {
    fn default() -> Self {
        Self {
            images: "images".to_string(),
            videos: "videos".to_string(),
        }
    }
}

impl CatalogCollections {
    /// Read collection names from `VISION_IMAGES_COLLECTION` / `VISION_VIDEOS_COLLECTION`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            images: std::env::var("VISION_IMAGES_COLLECTION").unwrap_or(defaults.images),
            videos: std::env::var("VISION_VIDEOS_COLLECTION").unwrap_or(defaults.videos),
        }
    }
}

/// Firestore-backed catalog.
#[derive(Clone)]
pub struct FirestoreCatalog {
    images: ImageRepository,
    videos: VideoRepository,
}

impl FirestoreCatalog {
    pub fn new(client: FirestoreClient, collections: CatalogCollections) -> Self {
        Self {
            images: ImageRepository::new(client.clone(), collections.images),
            videos: VideoRepository::new(client, collections.videos),
        }
    }
}

#[async_trait]
impl MediaCatalog for FirestoreCatalog {
    async fn get_video(&self, video_id: &VideoId) -> FirestoreResult<Option<VideoDocument>> {
        self.videos.get(video_id).await
    }

    async fn images_for_video(&self, video_id: &VideoId) -> FirestoreResult<Vec<ImageDocument>> {
        self.images.list_by_video(video_id).await
    }

    async fn standalone_images(&self) -> FirestoreResult<Vec<ImageDocument>> {
        self.images.list_standalone().await
    }

    async fn reset_analysis(&self, image_id: &ImageId) -> FirestoreResult<Option<AnalysisReset>> {
        self.images.reset_analysis(image_id).await
    }

    async fn delete_image(&self, image_id: &ImageId) -> FirestoreResult<bool> {
        self.images.delete(image_id).await
    }

    async fn processing_status(&self) -> ProcessingStatus {
        match self.images.counts().await {
            Ok(images) => ProcessingStatus { images },
            Err(e) => {
                warn!("Failed to count images: {}", e);
                ProcessingStatus::default()
            }
        }
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        self.videos.probe().await
    }
}
