//! Asset store port and the upload phase of image attachment.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::histogram;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::assets::{AssetKey, AssetRef, PendingImage};

const METRIC_ASSET_UPLOAD_MS: &str = "pressroom_asset_upload_ms";

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("invalid asset key `{0}`")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("asset backend error: {0}")]
    Backend(String),
}

/// Durable blob storage keyed by [`AssetKey`].
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        key: &AssetKey,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), AssetStoreError>;

    fn public_url(&self, key: &AssetKey) -> AssetRef;
}

/// Client side of the two-phase attachment flow.
///
/// Only the upload phase lives here; linking the returned reference into a
/// post is the caller's write. Nothing is ever deleted: replaced or orphaned
/// assets stay in the store.
#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn AssetStore>,
}

impl AssetUploader {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    pub async fn upload_image(
        &self,
        owner: Uuid,
        image: &PendingImage,
    ) -> Result<AssetRef, AssetStoreError> {
        let key = AssetKey::generate(owner, &image.extension());
        let started_at = Instant::now();

        if let Err(err) = self
            .store
            .upload(&key, image.content_type(), image.data().clone())
            .await
        {
            warn!(key = %key, file_name = image.file_name(), error = %err, "Asset upload failed");
            return Err(err);
        }

        histogram!(METRIC_ASSET_UPLOAD_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let reference = self.store.public_url(&key);
        info!(
            key = %key,
            size_bytes = image.data().len(),
            reference = %reference,
            "Asset uploaded"
        );
        Ok(reference)
    }
}
