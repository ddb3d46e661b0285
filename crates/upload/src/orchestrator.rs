//! Upload orchestrator: one resumable attempt from probe to catalog record.
//!
//! Each attempt asks the backend which chunks it already stores, sends the
//! rest (bounded by `max_in_flight`), uploads the thumbnail alongside, and
//! registers the metadata once the backend reports the assembled file.

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::stream::{self, StreamExt};
use mediadeck_protocol::{
    ChunkAck, FileRef, MediaKind, MetadataRecord, ThumbnailResult, UploadProgress, UploadState,
};
use mediadeck_transfer::{ChunkSource, SpeedCalculator, TransferError, UploadTarget};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{ChunkRequest, UploadBackend};
use crate::error::{BackendError, UploadError};
use crate::finalize::finalize;
use crate::types::{
    MediaDetails, ThumbnailFile, ThumbnailPolicy, UploadConfig, UploadEvent, UploadRequest,
    UploadResult,
};

/// Drives uploads against one backend.
pub struct UploadOrchestrator {
    backend: Arc<dyn UploadBackend>,
    config: UploadConfig,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
    cancel: Mutex<CancellationToken>,
    current: Mutex<Option<Arc<UploadTarget>>>,
}

impl UploadOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(backend: Arc<dyn UploadBackend>, config: UploadConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: Mutex::new(CancellationToken::new()),
            current: Mutex::new(None),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the token that cancels the running (or next) attempt.
    ///
    /// Once an attempt ends cancelled the orchestrator switches to a fresh
    /// token, so fetch it again before each attempt.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_slot().clone()
    }

    /// Snapshot of the most recent attempt, if any.
    pub fn progress(&self) -> Option<UploadProgress> {
        self.current_slot().as_ref().map(|t| t.progress())
    }

    /// Runs one upload attempt.
    ///
    /// Nothing is retried internally. Calling again with the same
    /// `file_name` resumes from whatever the backend already stores.
    pub async fn start_upload(
        &self,
        source: Arc<dyn ChunkSource>,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        let target = match self.prepare(source.as_ref(), &request) {
            Ok(target) => Arc::new(target),
            Err(e) => {
                *self.current_slot() = None;
                error!(file_name = %request.file_name, error = %e, "upload rejected");
                self.emit(UploadEvent::Failed {
                    file_name: request.file_name.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        *self.current_slot() = Some(Arc::clone(&target));

        let cancel = self.cancel_token();
        let outcome = self.run(&target, source, &request, &cancel).await;
        self.rearm(&cancel);

        match outcome {
            Ok(result) => {
                self.transition(&target, UploadState::Complete);
                self.emit(UploadEvent::Completed {
                    file_name: result.file_name.clone(),
                    record_id: result.record.id.clone(),
                });
                info!(
                    file_name = %result.file_name,
                    media_file_id = %result.media.file_id,
                    record_id = %result.record.id,
                    "upload completed"
                );
                Ok(result)
            }
            Err(e) => {
                let err_msg = e.to_string();
                target.fail(&err_msg);
                self.emit(UploadEvent::Progress {
                    file_name: request.file_name.clone(),
                    percent: 0,
                    bytes_per_second: 0.0,
                });
                self.emit(UploadEvent::StateChanged {
                    file_name: request.file_name.clone(),
                    state: UploadState::Failed,
                });
                self.emit(UploadEvent::Failed {
                    file_name: request.file_name.clone(),
                    error: err_msg.clone(),
                });
                error!(file_name = %request.file_name, error = %err_msg, "upload failed");
                Err(e)
            }
        }
    }

    /// Saves the catalog record for media the backend already assembled.
    ///
    /// Used after [`UploadError::Finalize`] to retry without re-uploading.
    pub async fn finalize_only(
        &self,
        details: &MediaDetails,
        media: &FileRef,
        thumbnail: Option<&FileRef>,
    ) -> Result<MetadataRecord, UploadError> {
        let cancel = self.cancel_token();
        let record = match check_cancelled(&cancel) {
            Ok(()) => self.save_metadata(details, media, thumbnail, &cancel).await,
            Err(e) => Err(e),
        };
        self.rearm(&cancel);
        match &record {
            Ok(r) => info!(media_file_id = %media.file_id, record_id = %r.id, "metadata saved"),
            Err(e) => error!(media_file_id = %media.file_id, error = %e, "metadata retry failed"),
        }
        record
    }

    fn prepare(
        &self,
        source: &dyn ChunkSource,
        request: &UploadRequest,
    ) -> Result<UploadTarget, UploadError> {
        if source.size() == 0 {
            return Err(UploadError::EmptyFile);
        }
        if self.config.thumbnail == ThumbnailPolicy::Required && request.thumbnail.is_none() {
            return Err(UploadError::MissingThumbnail);
        }
        Ok(UploadTarget::new(
            request.file_name.clone(),
            source.size(),
            self.config.chunk_size,
        )?)
    }

    async fn run(
        &self,
        target: &UploadTarget,
        source: Arc<dyn ChunkSource>,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let file_name = target.file_name();
        let total = target.total_chunks();

        // 1. Probe
        self.transition(target, UploadState::Probing);
        check_cancelled(cancel)?;
        let present = self
            .guarded(self.backend.probe(file_name), UploadError::Probe, cancel)
            .await?;
        target.merge_uploaded(present);

        let skipped = target.uploaded_chunks().len() as u32;
        if skipped > 0 {
            info!(file_name, skipped, total, "resuming upload");
            self.emit(UploadEvent::Resumed {
                file_name: file_name.to_string(),
                skipped,
                total,
            });
        }

        // 2. Chunks and thumbnail
        check_cancelled(cancel)?;
        self.transition(target, UploadState::Uploading);
        let ((media, media_url), thumbnail) = tokio::try_join!(
            self.upload_chunks(target, source, request.details.kind, cancel),
            self.upload_thumbnail(request.thumbnail.as_ref(), cancel),
        )?;

        // 3. Metadata
        check_cancelled(cancel)?;
        self.transition(target, UploadState::Finalizing);
        let thumbnail_ref = thumbnail.as_ref().map(|t| t.file.clone());
        let record = self
            .save_metadata(&request.details, &media, thumbnail_ref.as_ref(), cancel)
            .await?;

        Ok(UploadResult {
            file_name: file_name.to_string(),
            media,
            media_url,
            thumbnail,
            record,
        })
    }

    /// Sends every pending chunk until the backend reports the assembled file.
    async fn upload_chunks(
        &self,
        target: &UploadTarget,
        source: Arc<dyn ChunkSource>,
        kind: MediaKind,
        cancel: &CancellationToken,
    ) -> Result<(FileRef, Option<String>), UploadError> {
        let total = target.total_chunks();
        let speed = SpeedCalculator::default();

        // Results arrive in index order. Returning early drops the stream,
        // which aborts requests still in flight.
        let mut results = stream::iter(target.pending_indices())
            .map(move |index| self.send_chunk(target, Arc::clone(&source), index, kind, cancel))
            .buffered(self.config.max_in_flight.max(1));

        while let Some(result) = results.next().await {
            let (index, bytes, ack) = result?;
            target.mark_uploaded(index);
            target.advance_past(index);
            let percent = target.report_progress(index);
            speed.add_sample(bytes);
            self.emit(UploadEvent::Progress {
                file_name: target.file_name().to_string(),
                percent,
                bytes_per_second: speed.bytes_per_second(),
            });

            if let Some(file) = ack.file {
                info!(
                    file_name = %target.file_name(),
                    index,
                    total,
                    file_id = %file.file_id,
                    "backend assembled file"
                );
                return Ok((file, ack.url));
            }
        }

        Err(UploadError::IncompleteAssembly {
            file_name: target.file_name().to_string(),
        })
    }

    async fn send_chunk(
        &self,
        target: &UploadTarget,
        source: Arc<dyn ChunkSource>,
        index: u32,
        kind: MediaKind,
        cancel: &CancellationToken,
    ) -> Result<(u32, u64, ChunkAck), UploadError> {
        check_cancelled(cancel)?;
        let chunk = target.chunk(index)?;
        let data = tokio::task::spawn_blocking(move || source.read_chunk(&chunk))
            .await
            .map_err(|e| TransferError::Io(io::Error::other(e)))??;
        let bytes = data.len() as u64;

        debug!(
            file_name = %target.file_name(),
            index,
            total = target.total_chunks(),
            bytes,
            "sending chunk"
        );
        let request = ChunkRequest {
            file_name: target.file_name().to_string(),
            index,
            total_chunks: target.total_chunks(),
            data,
            thumbnail_flag: kind.sends_thumbnail_flag(),
        };
        let ack = self
            .guarded(
                self.backend.upload_chunk(request),
                |source| UploadError::Chunk { index, source },
                cancel,
            )
            .await?;
        Ok((index, bytes, ack))
    }

    async fn upload_thumbnail(
        &self,
        thumbnail: Option<&ThumbnailFile>,
        cancel: &CancellationToken,
    ) -> Result<Option<ThumbnailResult>, UploadError> {
        let Some(thumb) = thumbnail else {
            return Ok(None);
        };

        let result = self
            .guarded(
                self.backend.upload_thumbnail(&thumb.file_name, &thumb.data),
                UploadError::Thumbnail,
                cancel,
            )
            .await;

        match result {
            Ok(uploaded) => {
                debug!(file_name = %thumb.file_name, file_id = %uploaded.file.file_id, "thumbnail uploaded");
                Ok(Some(uploaded))
            }
            Err(UploadError::Cancelled) => Err(UploadError::Cancelled),
            Err(e) if self.config.thumbnail == ThumbnailPolicy::Optional => {
                warn!(file_name = %thumb.file_name, error = %e, "continuing without thumbnail");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save_metadata(
        &self,
        details: &MediaDetails,
        media: &FileRef,
        thumbnail: Option<&FileRef>,
        cancel: &CancellationToken,
    ) -> Result<MetadataRecord, UploadError> {
        self.guarded(
            finalize(self.backend.as_ref(), details, media, thumbnail),
            |source| UploadError::Finalize {
                media: media.clone(),
                thumbnail: thumbnail.cloned(),
                source,
            },
            cancel,
        )
        .await
    }

    /// Races a backend call against cancellation and the request timeout.
    async fn guarded<T, F>(
        &self,
        call: F,
        wrap: impl FnOnce(BackendError) -> UploadError,
        cancel: &CancellationToken,
    ) -> Result<T, UploadError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let limit = self.config.request_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            res = tokio::time::timeout(limit, call) => match res {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(wrap(e)),
                Err(_) => Err(wrap(BackendError::Timeout(limit))),
            },
        }
    }

    fn transition(&self, target: &UploadTarget, state: UploadState) {
        if target.set_state(state) {
            debug!(file_name = %target.file_name(), state = ?state, "state changed");
            self.emit(UploadEvent::StateChanged {
                file_name: target.file_name().to_string(),
                state,
            });
        }
    }

    fn emit(&self, event: UploadEvent) {
        // Nobody listening is fine.
        let _ = self.events_tx.send(event);
    }

    /// Swaps in a fresh token if `used` was cancelled, so the user can
    /// re-initiate the upload.
    fn rearm(&self, used: &CancellationToken) {
        if used.is_cancelled() {
            let mut slot = self.cancel_slot();
            if slot.is_cancelled() {
                *slot = CancellationToken::new();
            }
        }
    }

    fn cancel_slot(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_slot(&self) -> MutexGuard<'_, Option<Arc<UploadTarget>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}
