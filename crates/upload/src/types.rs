//! Data types for the upload flow.

use std::time::Duration;

use mediadeck_protocol::{FileRef, MediaKind, MetadataRecord, ThumbnailResult, UploadState};
use mediadeck_transfer::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// Whether an upload may be published without a thumbnail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailPolicy {
    /// A missing or failed thumbnail aborts the upload.
    Required,
    /// A failed thumbnail is logged and the record is saved without one.
    #[default]
    Optional,
}

/// Tunables for one orchestrator.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Chunk size in bytes, fixed for the whole attempt.
    pub chunk_size: u32,
    /// Maximum chunk requests in flight. `1` uploads strictly sequentially.
    pub max_in_flight: usize,
    /// Bound on every backend call.
    pub request_timeout: Duration,
    pub thumbnail: ThumbnailPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: 1,
            request_timeout: Duration::from_secs(60),
            thumbnail: ThumbnailPolicy::default(),
        }
    }
}

/// Descriptive fields of the catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub kind: MediaKind,
}

/// A thumbnail image, uploaded in a single request.
#[derive(Debug, Clone)]
pub struct ThumbnailFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Everything the user submitted in the upload form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Backend file name, unique per upload.
    pub file_name: String,
    pub details: MediaDetails,
    pub thumbnail: Option<ThumbnailFile>,
}

/// Progress event emitted during an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The attempt moved to a new state.
    StateChanged { file_name: String, state: UploadState },
    /// The probe found chunks the backend already stores.
    Resumed { file_name: String, skipped: u32, total: u32 },
    /// Progress update. Reset to zero when the attempt fails.
    Progress {
        file_name: String,
        percent: u8,
        bytes_per_second: f64,
    },
    /// The catalog record was saved.
    Completed { file_name: String, record_id: String },
    /// The attempt failed.
    Failed { file_name: String, error: String },
}

/// Outcome of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub file_name: String,
    pub media: FileRef,
    pub media_url: Option<String>,
    pub thumbnail: Option<ThumbnailResult>,
    pub record: MetadataRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sequential() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.chunk_size, 5 * 1024 * 1024);
        assert_eq!(cfg.max_in_flight, 1);
        assert_eq!(cfg.thumbnail, ThumbnailPolicy::Optional);
    }
}
