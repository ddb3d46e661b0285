//! Network seam of the upload pipeline.
//!
//! `UploadBackend` is implemented by the app on top of the HTTP client.
//! Using a trait keeps the orchestrator decoupled from transport and
//! testable with mocks.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use mediadeck_protocol::{ChunkAck, MetadataRecord, MetadataRequest, ThumbnailResult};

use crate::error::BackendError;

/// Boxed future returned by every backend call.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// One chunk ready to send.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub file_name: String,
    pub index: u32,
    pub total_chunks: u32,
    pub data: Vec<u8>,
    /// Send `isThumbnail=false` alongside the chunk (reels).
    pub thumbnail_flag: bool,
}

/// Abstract connection to the upload and catalog services.
///
/// The backend treats `(file_name, index)` as an idempotent upsert key, so
/// repeating a chunk is always safe.
pub trait UploadBackend: Send + Sync {
    /// Returns the chunk indices already stored for `file_name`.
    fn probe<'a>(&'a self, file_name: &'a str) -> BackendFuture<'a, BTreeSet<u32>>;

    /// Uploads one chunk. A file reference in the ack means the backend has
    /// assembled the whole file.
    fn upload_chunk(&self, chunk: ChunkRequest) -> BackendFuture<'_, ChunkAck>;

    /// Uploads a thumbnail image in one request.
    fn upload_thumbnail<'a>(
        &'a self,
        file_name: &'a str,
        data: &'a [u8],
    ) -> BackendFuture<'a, ThumbnailResult>;

    /// Creates the catalog record.
    fn create_metadata<'a>(
        &'a self,
        request: &'a MetadataRequest,
    ) -> BackendFuture<'a, MetadataRecord>;
}
