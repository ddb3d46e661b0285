//! Upload error types.

use std::time::Duration;

use mediadeck_protocol::{FileRef, ProtocolError};
use mediadeck_transfer::TransferError;

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors produced by an upload attempt.
///
/// None of these are retried internally. A fresh attempt re-runs the resume
/// probe, so chunks the backend already stores are not sent again.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file is empty")]
    EmptyFile,

    #[error("a thumbnail is required for this upload")]
    MissingThumbnail,

    #[error("could not check upload progress: {0}")]
    Probe(#[source] BackendError),

    #[error("chunk {index} failed: {source}")]
    Chunk { index: u32, source: BackendError },

    #[error("thumbnail upload failed: {0}")]
    Thumbnail(#[source] BackendError),

    #[error("upload of {file_name} ended without the server assembling the file")]
    IncompleteAssembly { file_name: String },

    #[error("media uploaded as {} but saving its details failed: {source}", .media.file_id)]
    Finalize {
        media: FileRef,
        thumbnail: Option<FileRef>,
        source: BackendError,
    },

    #[error("upload cancelled")]
    Cancelled,

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl UploadError {
    /// Returns `true` when the media is stored and only the catalog record is
    /// missing, so finalization can be retried without re-uploading.
    pub fn is_retryable_finalize(&self) -> bool {
        matches!(self, UploadError::Finalize { .. })
    }
}
