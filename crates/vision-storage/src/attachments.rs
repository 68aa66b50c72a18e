//! Binary attachments of image and video documents.
//!
//! Each document owns the objects under `attachments/{doc_id}/`, e.g. the
//! original upload of an image (`image.jpg`) or a video thumbnail.

use async_trait::async_trait;
use tracing::debug;

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

const ATTACHMENTS_PREFIX: &str = "attachments";

/// Content type for attachments stored without one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A downloaded attachment.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Read and cleanup access to document attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Fetch attachment `name` of a document.
    async fn get_attachment(&self, doc_id: &str, name: &str) -> StorageResult<Attachment>;

    /// Delete every attachment of a document, returning how many were removed.
    async fn delete_attachments(&self, doc_id: &str) -> StorageResult<u32>;

    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// Reject segments that would escape the document's prefix.
fn key_segment(segment: &str) -> StorageResult<&str> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('/') {
        return Err(StorageError::invalid_key(segment));
    }
    Ok(segment)
}

/// Prefix owning all attachments of a document.
pub fn attachments_prefix(doc_id: &str) -> StorageResult<String> {
    Ok(format!("{}/{}/", ATTACHMENTS_PREFIX, key_segment(doc_id)?))
}

/// Object key of one attachment.
pub fn attachment_key(doc_id: &str, name: &str) -> StorageResult<String> {
    Ok(format!("{}{}", attachments_prefix(doc_id)?, key_segment(name)?))
}

/// Content type to serve when the object carries none.
fn fallback_content_type(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".png") {
        "image/png"
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

#[async_trait]
impl AttachmentStore for R2Client {
    async fn get_attachment(&self, doc_id: &str, name: &str) -> StorageResult<Attachment> {
        let key = attachment_key(doc_id, name)?;
        let object = self.get_object(&key).await?;

        Ok(Attachment {
            content_type: object
                .content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| fallback_content_type(name).to_string()),
            bytes: object.bytes,
        })
    }

    async fn delete_attachments(&self, doc_id: &str) -> StorageResult<u32> {
        let keys = self.list_keys(&attachments_prefix(doc_id)?).await?;
        debug!(doc_id = %doc_id, count = keys.len(), "Deleting attachments");
        self.delete_objects(&keys).await
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        R2Client::check_connectivity(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_key() {
        assert_eq!(
            attachment_key("frame-1", "image.jpg").unwrap(),
            "attachments/frame-1/image.jpg"
        );
        assert_eq!(attachments_prefix("v1").unwrap(), "attachments/v1/");
    }

    #[test]
    fn test_rejects_escaping_segments() {
        assert!(attachment_key("..", "image.jpg").is_err());
        assert!(attachment_key("a/b", "image.jpg").is_err());
        assert!(attachment_key("frame-1", "").is_err());
        assert!(attachment_key("frame-1", "../x.jpg").unwrap_err().is_not_found());
    }

    #[test]
    fn test_fallback_content_type() {
        assert_eq!(fallback_content_type("thumbnail.jpg"), "image/jpeg");
        assert_eq!(fallback_content_type("IMAGE.JPEG"), "image/jpeg");
        assert_eq!(fallback_content_type("map.png"), "image/png");
        assert_eq!(fallback_content_type("blob"), DEFAULT_CONTENT_TYPE);
    }
}
