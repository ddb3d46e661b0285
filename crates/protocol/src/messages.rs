use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::types::{FileRef, MediaKind, ThumbnailResult};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode<T: for<'de> Deserialize<'de>>(
    endpoint: &'static str,
    body: &[u8],
) -> Result<T, ProtocolError> {
    serde_json::from_slice(body).map_err(|e| ProtocolError::malformed(endpoint, e.to_string()))
}

/// A file reference as it appears on the wire.
///
/// Some backends emit numeric ids, so both strings and numbers are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileRef {
    #[serde(default)]
    file_id: Option<serde_json::Value>,
}

impl WireFileRef {
    fn validate(self, endpoint: &'static str) -> Result<FileRef, ProtocolError> {
        let id = match self.file_id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(ProtocolError::malformed(
                    endpoint,
                    format!("fileId has unexpected type: {other}"),
                ));
            }
            None => return Err(ProtocolError::malformed(endpoint, "file without fileId")),
        };
        if id.trim().is_empty() {
            return Err(ProtocolError::malformed(endpoint, "empty fileId"));
        }
        Ok(FileRef::new(id))
    }
}

// ---------------------------------------------------------------------------
// Chunk upload
// ---------------------------------------------------------------------------

/// Raw body of a chunk-upload response: `{ file?: { fileId }, url? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkUploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<WireFileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

/// Validated outcome of one chunk upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkAck {
    /// Present only once the backend has assembled every chunk.
    pub file: Option<FileRef>,
    pub url: Option<String>,
}

impl ChunkAck {
    /// Chunk accepted, upload not yet assembled.
    pub fn accepted() -> Self {
        Self::default()
    }

    /// Backend reports the assembled file.
    pub fn assembled(file_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file: Some(FileRef::new(file_id)),
            url: Some(url.into()),
        }
    }

    /// Returns `true` if this response is the assembly completion signal.
    pub fn is_complete(&self) -> bool {
        self.file.is_some()
    }
}

impl ChunkUploadResponse {
    const ENDPOINT: &'static str = "chunk upload";

    /// Decodes and validates a chunk-upload response body.
    pub fn parse(body: &[u8]) -> Result<ChunkAck, ProtocolError> {
        let raw: Self = decode(Self::ENDPOINT, body)?;
        raw.validate()
    }

    pub fn validate(self) -> Result<ChunkAck, ProtocolError> {
        let file = self
            .file
            .map(|f| f.validate(Self::ENDPOINT))
            .transpose()?;
        Ok(ChunkAck {
            file,
            url: self.url.filter(|u| !u.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Thumbnail upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct WireThumb {
    #[serde(default)]
    file: Option<WireFileRef>,
    #[serde(default)]
    url: Option<String>,
}

/// Raw body of a thumbnail-upload response: `{ thumbUrl: { file: { fileId }, url } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailUploadResponse {
    #[serde(default)]
    thumb_url: Option<WireThumb>,
}

impl ThumbnailUploadResponse {
    const ENDPOINT: &'static str = "thumbnail upload";

    /// Decodes and validates a thumbnail-upload response body.
    pub fn parse(body: &[u8]) -> Result<ThumbnailResult, ProtocolError> {
        let raw: Self = decode(Self::ENDPOINT, body)?;
        raw.validate()
    }

    pub fn validate(self) -> Result<ThumbnailResult, ProtocolError> {
        let thumb = self
            .thumb_url
            .ok_or_else(|| ProtocolError::malformed(Self::ENDPOINT, "missing thumbUrl"))?;
        let file = thumb
            .file
            .ok_or_else(|| ProtocolError::malformed(Self::ENDPOINT, "missing thumbUrl.file"))?
            .validate(Self::ENDPOINT)?;
        let url = thumb
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProtocolError::malformed(Self::ENDPOINT, "missing thumbUrl.url"))?;
        Ok(ThumbnailResult { file, url })
    }
}

// ---------------------------------------------------------------------------
// Resume probe
// ---------------------------------------------------------------------------

/// Raw body of the upload-progress endpoint: `{ uploadedChunks: [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(default)]
    uploaded_chunks: Option<Vec<i64>>,
}

impl ProgressResponse {
    const ENDPOINT: &'static str = "upload progress";

    /// Decodes and validates a progress response into the set of stored indices.
    pub fn parse(body: &[u8]) -> Result<BTreeSet<u32>, ProtocolError> {
        let raw: Self = decode(Self::ENDPOINT, body)?;
        raw.validate()
    }

    pub fn validate(self) -> Result<BTreeSet<u32>, ProtocolError> {
        let indices = self
            .uploaded_chunks
            .ok_or_else(|| ProtocolError::malformed(Self::ENDPOINT, "missing uploadedChunks"))?;
        indices
            .into_iter()
            .map(|i| {
                u32::try_from(i).map_err(|_| {
                    ProtocolError::malformed(Self::ENDPOINT, format!("invalid chunk index {i}"))
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Catalog entry created once the media file is fully assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub media_file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,
    pub media_type: MediaKind,
}

/// Saved catalog record returned by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaKind>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordEnvelope {
    Wrapped { data: MetadataRecord },
    Bare(MetadataRecord),
}

impl MetadataRecord {
    const ENDPOINT: &'static str = "metadata";

    /// Decodes a saved record, bare or wrapped as `{ "data": record }`.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let record = match decode::<RecordEnvelope>(Self::ENDPOINT, body)? {
            RecordEnvelope::Wrapped { data } => data,
            RecordEnvelope::Bare(record) => record,
        };
        if record.id.trim().is_empty() {
            return Err(ProtocolError::malformed(Self::ENDPOINT, "empty record id"));
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// External media host
// ---------------------------------------------------------------------------

/// Asks the external media host for an upload slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
}

/// Upload slot on the external media host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoResponse {
    pub video_id: String,
    pub upload_url: String,
}

impl CreateVideoResponse {
    const ENDPOINT: &'static str = "create video";

    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let resp: Self = decode(Self::ENDPOINT, body)?;
        if resp.video_id.is_empty() {
            return Err(ProtocolError::malformed(Self::ENDPOINT, "empty videoId"));
        }
        if resp.upload_url.is_empty() {
            return Err(ProtocolError::malformed(Self::ENDPOINT, "empty uploadUrl"));
        }
        Ok(resp)
    }
}
