//! Resumable chunked media upload.
//!
//! This crate implements the **business logic** of publishing a video or
//! reel from the dashboard. It has no HTTP dependency: the app provides an
//! [`UploadBackend`] implementation that bridges to the real API client.
//!
//! # Pipeline
//!
//! 1. **Probe**: ask the backend which chunks it already stores
//! 2. **Upload**: send the missing chunks (and the thumbnail, concurrently)
//! 3. **Detect completion**: the backend returns a file reference once it
//!    has assembled every chunk
//! 4. **Finalize**: register the catalog record for the assembled file

pub mod backend;
pub mod error;
pub mod finalize;
pub mod orchestrator;
pub mod types;

pub use backend::{BackendFuture, ChunkRequest, UploadBackend};
pub use error::{BackendError, UploadError};
pub use finalize::{build_metadata, finalize};
pub use orchestrator::UploadOrchestrator;
pub use types::{
    MediaDetails, ThumbnailFile, ThumbnailPolicy, UploadConfig, UploadEvent, UploadRequest,
    UploadResult,
};
