use serde::{Deserialize, Serialize};

/// Reference to a file assembled and stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub file_id: String,
}

impl FileRef {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

/// Kind of media being uploaded.
///
/// Reels carry an explicit `isThumbnail=false` field on every chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Reel,
}

impl MediaKind {
    /// Value of the `mediaType` metadata field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Reel => "reel",
        }
    }

    /// Whether chunk uploads for this kind carry the `isThumbnail` field.
    pub fn sends_thumbnail_flag(&self) -> bool {
        matches!(self, MediaKind::Reel)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single-shot thumbnail upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailResult {
    pub file: FileRef,
    pub url: String,
}

/// Lifecycle state of one upload attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    #[default]
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "probing")]
    Probing,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "finalizing")]
    Finalizing,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "failed")]
    Failed,
}

impl UploadState {
    /// Returns `true` if `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Idle, Probing)
                | (Probing, Uploading)
                | (Probing, Failed)
                | (Uploading, Finalizing)
                | (Uploading, Failed)
                | (Finalizing, Complete)
                | (Finalizing, Failed)
        )
    }
}

/// Snapshot of an upload attempt for progress displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub file_name: String,
    pub state: UploadState,
    pub total_chunks: u32,
    pub uploaded_chunks: u32,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}
