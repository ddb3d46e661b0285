//! Wire types for the MediaDeck upload and catalog endpoints.
//!
//! Every response body is decoded into a loosely-typed wire struct and then
//! validated into the strong type the rest of the workspace consumes. A body
//! that does not match its endpoint's contract fails with
//! [`ProtocolError::MalformedResponse`] instead of leaking missing fields.

pub mod messages;
pub mod types;

pub use messages::{
    ChunkAck, ChunkUploadResponse, CreateVideoRequest, CreateVideoResponse, MetadataRecord,
    MetadataRequest, ProgressResponse, ThumbnailUploadResponse,
};
pub use types::{FileRef, MediaKind, ThumbnailResult, UploadProgress, UploadState};

/// Errors produced while validating response bodies.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed {endpoint} response: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint,
            reason: reason.into(),
        }
    }
}
