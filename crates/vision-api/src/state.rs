//! Application state.

use std::sync::Arc;

use vision_firestore::{CatalogCollections, FirestoreCatalog, FirestoreClient, MediaCatalog};
use vision_storage::{AttachmentStore, R2Client};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub catalog: Arc<dyn MediaCatalog>,
    pub attachments: Arc<dyn AttachmentStore>,
}

impl AppState {
    /// Connect to Firestore and R2 using environment configuration.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let storage = R2Client::from_env().await?;
        let catalog = FirestoreCatalog::new(firestore, CatalogCollections::from_env());

        Ok(Self::with_backends(config, Arc::new(catalog), Arc::new(storage)))
    }

    /// Assemble state from existing backends.
    pub fn with_backends(
        config: ApiConfig,
        catalog: Arc<dyn MediaCatalog>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            attachments,
        }
    }
}
