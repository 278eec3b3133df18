use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::util::random_string;

/// Opaque reference to a stored blob
pub type BlobId = String;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob:{0} doesn't exist")]
    NotFound(BlobId),
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Byte storage for audio clips and images.
///
/// The collab layer only ever deals in [BlobId] references, the bytes
/// themselves live behind this trait.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobId, BlobError>;
    async fn get(&self, blob_id: &str) -> Result<Vec<u8>, BlobError>;
    async fn delete(&self, blob_id: &str) -> Result<(), BlobError>;
}

/// The result of trimming an audio clip
#[derive(Debug, Clone)]
pub struct TrimmedAudio {
    pub bytes: Vec<u8>,
    /// New clip length in seconds
    pub duration: f32,
}

/// A trim failure is an I/O problem with the external media tool and can
/// be retried with the same input.
#[derive(Debug, Error)]
#[error("audio trim failed: {0}")]
pub struct TrimError(pub String);

/// Cuts an audio clip down to the given range via an external media tool.
#[async_trait]
pub trait AudioTrimmer: Send + Sync + 'static {
    async fn trim(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        start: f32,
        end: f32,
    ) -> Result<TrimmedAudio, TrimError>;
}

/// An in-process blob store, used by the test suites
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobId, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<BlobId, BlobError> {
        let blob_id = random_string(24);
        self.blobs.lock().insert(blob_id.clone(), bytes);

        Ok(blob_id)
    }

    async fn get(&self, blob_id: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .get(blob_id)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(blob_id.to_string()))
    }

    async fn delete(&self, blob_id: &str) -> Result<(), BlobError> {
        self.blobs
            .lock()
            .remove(blob_id)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(blob_id.to_string()))
    }
}
