//! MediaDeck API client.
//!
//! Every response body is validated by `mediadeck-protocol` before it leaves
//! this module.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use mediadeck_protocol::{
    ChunkAck, ChunkUploadResponse, CreateVideoRequest, CreateVideoResponse, MediaKind,
    MetadataRecord, MetadataRequest, ProgressResponse, ProtocolError, ThumbnailResult,
    ThumbnailUploadResponse,
};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credentials::CredentialProvider;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Error {
    /// Returns `true` if the request hit the client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_timeout())
    }
}

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub upload: String,
    pub progress: String,
    pub video_metadata: String,
    pub reel_metadata: String,
    pub create_video: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            upload: "/api/upload/chunk".into(),
            progress: "/api/upload/progress".into(),
            video_metadata: "/api/videos".into(),
            reel_metadata: "/api/reels".into(),
            create_video: "/api/create-video".into(),
        }
    }
}

impl Endpoints {
    /// Catalog endpoint for `kind`.
    pub fn metadata_for(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Video => &self.video_metadata,
            MediaKind::Reel => &self.reel_metadata,
        }
    }
}

/// Client construction parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoints: Endpoints,
    /// Per-request timeout, shorter than any session timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fields of one chunk-upload request.
#[derive(Debug, Clone, Copy)]
pub struct ChunkUpload<'a> {
    pub file_name: &'a str,
    pub index: u32,
    pub total_chunks: u32,
    pub data: &'a [u8],
    /// Reels send `isThumbnail=false`; videos omit the field.
    pub thumbnail_flag: bool,
}

/// MediaDeck API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
    credentials: Arc<dyn CredentialProvider>,
}

impl Client {
    /// Creates a client for `config.base_url`.
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, Error> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidBaseUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            endpoints: config.endpoints,
            credentials,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Sends an authenticated request built by `build`.
    ///
    /// On 401/403 the credential provider gets one chance to refresh; the
    /// request is then rebuilt and sent once more.
    async fn send_authed<F>(&self, build: F) -> Result<Vec<u8>, Error>
    where
        F: Fn(&reqwest::Client) -> Result<reqwest::RequestBuilder, Error>,
    {
        let mut refreshed = false;
        loop {
            let mut req = build(&self.http)?;
            if let Some(token) = self.credentials.bearer_token() {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await?;
            let status = resp.status();

            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) && !refreshed {
                refreshed = true;
                if self.credentials.refresh().await {
                    debug!(status = status.as_u16(), "credentials refreshed, retrying");
                    continue;
                }
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(resp.bytes().await?.to_vec());
        }
    }

    /// Returns the chunk indices the backend already stores for `file_name`.
    pub async fn upload_progress(&self, file_name: &str) -> Result<BTreeSet<u32>, Error> {
        let url = self.url(&self.endpoints.progress);
        let body = self
            .send_authed(|http| Ok(http.get(&url).query(&[("fileName", file_name)])))
            .await?;
        Ok(ProgressResponse::parse(&body)?)
    }

    /// Uploads one chunk as multipart form data.
    pub async fn upload_chunk(&self, chunk: ChunkUpload<'_>) -> Result<ChunkAck, Error> {
        let url = self.url(&self.endpoints.upload);
        let body = self
            .send_authed(|http| {
                let part = Part::bytes(chunk.data.to_vec())
                    .file_name(chunk.file_name.to_string())
                    .mime_str("application/octet-stream")?;
                let mut form = Form::new()
                    .text("fileName", chunk.file_name.to_string())
                    .text("chunkIndex", chunk.index.to_string())
                    .text("totalChunks", chunk.total_chunks.to_string());
                if chunk.thumbnail_flag {
                    form = form.text("isThumbnail", "false");
                }
                Ok(http.post(&url).multipart(form.part("chunk", part)))
            })
            .await?;
        Ok(ChunkUploadResponse::parse(&body)?)
    }

    /// Uploads a thumbnail image in a single request.
    pub async fn upload_thumbnail(
        &self,
        file_name: &str,
        data: &[u8],
    ) -> Result<ThumbnailResult, Error> {
        let url = self.url(&self.endpoints.upload);
        let mime = image_mime(file_name);
        let body = self
            .send_authed(|http| {
                let part = Part::bytes(data.to_vec())
                    .file_name(file_name.to_string())
                    .mime_str(mime)?;
                let form = Form::new()
                    .text("fileName", file_name.to_string())
                    .text("chunkIndex", "0")
                    .text("totalChunks", "1")
                    .text("isThumbnail", "true")
                    .part("chunk", part);
                Ok(http.post(&url).multipart(form))
            })
            .await?;
        Ok(ThumbnailUploadResponse::parse(&body)?)
    }

    /// Registers the catalog record for an assembled upload.
    pub async fn create_metadata(&self, req: &MetadataRequest) -> Result<MetadataRecord, Error> {
        let url = self.url(self.endpoints.metadata_for(req.media_type));
        let body = self
            .send_authed(|http| Ok(http.post(&url).json(req)))
            .await?;
        Ok(MetadataRecord::parse(&body)?)
    }

    /// Requests an upload slot on the external media host.
    pub async fn create_video(&self, title: &str) -> Result<CreateVideoResponse, Error> {
        let url = self.url(&self.endpoints.create_video);
        let req = CreateVideoRequest {
            title: title.to_string(),
        };
        let body = self
            .send_authed(|http| Ok(http.post(&url).json(&req)))
            .await?;
        Ok(CreateVideoResponse::parse(&body)?)
    }

    /// Uploads a whole file to an external media-host slot.
    ///
    /// The slot is authorized by `access_key`, not by the dashboard session.
    pub async fn put_video(
        &self,
        upload_url: &str,
        access_key: &str,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        let size = data.len();
        let resp = self
            .http
            .put(upload_url)
            .header("AccessKey", access_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "media host rejected upload");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        debug!(bytes = size, "media host accepted upload");
        Ok(())
    }
}

/// Guesses an image content type from a file name.
fn image_mime(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    match lower.rsplit('.').next().unwrap_or_default() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
