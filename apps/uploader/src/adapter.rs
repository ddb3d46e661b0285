//! Adapter bridging the HTTP `Client` to the `UploadBackend` trait
//! required by the upload crate.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use mediadeck_api::client::ChunkUpload;
use mediadeck_api::{Client, Error as ApiError};
use mediadeck_protocol::{ChunkAck, MetadataRecord, MetadataRequest, ThumbnailResult};
use mediadeck_upload::{BackendError, BackendFuture, ChunkRequest, UploadBackend};

/// Implements `UploadBackend` by delegating to the API client.
pub struct ApiBackend {
    client: Arc<Client>,
    timeout: Duration,
}

impl ApiBackend {
    /// `timeout` is reported when the client's own request timeout fires.
    pub fn new(client: Arc<Client>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_error(&self, e: ApiError) -> BackendError {
        backend_error(e, self.timeout)
    }
}

fn backend_error(e: ApiError, timeout: Duration) -> BackendError {
    if e.is_timeout() {
        return BackendError::Timeout(timeout);
    }
    match e {
        ApiError::Api { status, body } => BackendError::Status { status, body },
        ApiError::Protocol(p) => BackendError::Malformed(p),
        other => BackendError::Transport(other.to_string()),
    }
}

impl UploadBackend for ApiBackend {
    fn probe<'a>(&'a self, file_name: &'a str) -> BackendFuture<'a, BTreeSet<u32>> {
        Box::pin(async move {
            self.client
                .upload_progress(file_name)
                .await
                .map_err(|e| self.map_error(e))
        })
    }

    fn upload_chunk(&self, chunk: ChunkRequest) -> BackendFuture<'_, ChunkAck> {
        Box::pin(async move {
            let upload = ChunkUpload {
                file_name: &chunk.file_name,
                index: chunk.index,
                total_chunks: chunk.total_chunks,
                data: &chunk.data,
                thumbnail_flag: chunk.thumbnail_flag,
            };
            self.client
                .upload_chunk(upload)
                .await
                .map_err(|e| self.map_error(e))
        })
    }

    fn upload_thumbnail<'a>(
        &'a self,
        file_name: &'a str,
        data: &'a [u8],
    ) -> BackendFuture<'a, ThumbnailResult> {
        Box::pin(async move {
            self.client
                .upload_thumbnail(file_name, data)
                .await
                .map_err(|e| self.map_error(e))
        })
    }

    fn create_metadata<'a>(
        &'a self,
        request: &'a MetadataRequest,
    ) -> BackendFuture<'a, MetadataRecord> {
        Box::pin(async move {
            self.client
                .create_metadata(request)
                .await
                .map_err(|e| self.map_error(e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadeck_protocol::ProtocolError;

    #[test]
    fn status_errors_keep_code_and_body() {
        let err = backend_error(
            ApiError::Api {
                status: 413,
                body: "too large".into(),
            },
            Duration::from_secs(1),
        );
        assert!(matches!(
            err,
            BackendError::Status { status: 413, ref body } if body == "too large"
        ));
    }

    #[test]
    fn protocol_errors_become_malformed() {
        let err = backend_error(
            ApiError::Protocol(ProtocolError::MalformedResponse {
                endpoint: "upload",
                reason: "file without fileId".into(),
            }),
            Duration::from_secs(1),
        );
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[test]
    fn other_errors_are_transport() {
        let err = backend_error(
            ApiError::InvalidBaseUrl("ftp://x".into()),
            Duration::from_secs(1),
        );
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
