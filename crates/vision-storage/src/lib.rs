//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Object download, listing and deletion on R2
//! - The `AttachmentStore` trait for per-document binary attachments

pub mod attachments;
pub mod client;
pub mod error;

pub use attachments::{attachment_key, attachments_prefix, Attachment, AttachmentStore};
pub use client::{R2Client, R2Config, StoredObject};
pub use error::{StorageError, StorageResult};
