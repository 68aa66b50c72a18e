//! Firestore REST API client.
//!
//! This crate provides:
//! - A REST client with cached service-account auth or emulator access
//! - Retried reads and request metrics
//! - Typed repositories for images and videos
//! - The `MediaCatalog` trait the API is written against

pub mod catalog;
pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use catalog::{CatalogCollections, FirestoreCatalog, MediaCatalog};
pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{ImageRepository, VideoRepository};
pub use retry::RetryConfig;
pub use types::{Document, ToFirestoreValue, Value};
