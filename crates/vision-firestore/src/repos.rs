//! Typed repositories for image and video documents.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use vision_models::{AnalysisReset, ImageCounts, ImageDocument, ImageId, VideoDocument, VideoId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, StructuredQuery, ToFirestoreValue};

/// Field linking a frame to its video.
const VIDEO_ID_FIELD: &str = "video_id";

/// Field holding the vision analysis of an image.
const ANALYSIS_FIELD: &str = "analysis";

fn decode<T: serde::de::DeserializeOwned>(collection: &str, doc: &Document) -> FirestoreResult<T> {
    doc.decode().map_err(|e| {
        FirestoreError::invalid_document(
            format!("{}/{}", collection, doc.id().unwrap_or("?")),
            e,
        )
    })
}

/// Decode a listing, leaving out documents that do not fit the model.
fn decode_all<'a, T, I>(collection: &str, docs: I) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
    I: IntoIterator<Item = &'a Document>,
{
    docs.into_iter()
        .filter_map(|doc| match decode(collection, doc) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping undecodable document: {}", e);
                None
            }
        })
        .collect()
}

/// Repository for image documents.
#[derive(Clone)]
pub struct ImageRepository {
    client: FirestoreClient,
    collection: String,
}

impl ImageRepository {
    pub fn new(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// All frames of a video, in document-ID order.
    pub async fn list_by_video(&self, video_id: &VideoId) -> FirestoreResult<Vec<ImageDocument>> {
        let query = StructuredQuery::field_equals(
            &self.collection,
            VIDEO_ID_FIELD,
            video_id.as_str().to_firestore_value(),
        )
        .order_by_ascending("__name__");

        let docs = self.client.run_query(query).await?;
        debug!(video_id = %video_id, frames = docs.len(), "Loaded video frames");

        Ok(decode_all(&self.collection, &docs))
    }

    /// Images that are not frames of any video.
    pub async fn list_standalone(&self) -> FirestoreResult<Vec<ImageDocument>> {
        let docs = self.client.list_all_documents(&self.collection).await?;
        Ok(decode_all(
            &self.collection,
            docs.iter().filter(|doc| !doc.has_field(VIDEO_ID_FIELD)),
        ))
    }

    /// Remove the analysis of an image, `None` if the image does not exist.
    pub async fn reset_analysis(&self, image_id: &ImageId) -> FirestoreResult<Option<AnalysisReset>> {
        match self
            .client
            .update_existing_document(&self.collection, image_id.as_str(), HashMap::new(), &[ANALYSIS_FIELD])
            .await
        {
            Ok(doc) => {
                info!(image_id = %image_id, "Removed image analysis");
                Ok(Some(AnalysisReset {
                    id: image_id.clone(),
                    update_time: doc.update_time,
                }))
            }
            Err(FirestoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete an image. Returns `false` if it did not exist.
    pub async fn delete(&self, image_id: &ImageId) -> FirestoreResult<bool> {
        let deleted = self
            .client
            .delete_document(&self.collection, image_id.as_str())
            .await?;
        if deleted {
            info!(image_id = %image_id, "Deleted image");
        }
        Ok(deleted)
    }

    /// Count all images and those still waiting for analysis.
    pub async fn counts(&self) -> FirestoreResult<ImageCounts> {
        let total = self.client.count(StructuredQuery::collection(&self.collection)).await?;
        let analyzed = self
            .client
            .count(StructuredQuery::collection(&self.collection).where_not_null(ANALYSIS_FIELD))
            .await?;

        Ok(ImageCounts {
            count: Some(total),
            to_be_analyzed: Some(total.saturating_sub(analyzed)),
        })
    }
}

/// Repository for video documents.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
    collection: String,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &VideoId) -> FirestoreResult<Option<VideoDocument>> {
        self.client
            .get_document(&self.collection, video_id.as_str())
            .await?
            .map(|doc| decode(&self.collection, &doc))
            .transpose()
    }

    /// Cheap read used as a connectivity probe.
    pub async fn probe(&self) -> FirestoreResult<()> {
        self.client
            .list_documents(&self.collection, Some(1), None)
            .await
            .map(|_| ())
    }
}
