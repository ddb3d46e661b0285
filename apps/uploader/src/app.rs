//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mediadeck_api::{Client, StaticCredentials};
use mediadeck_protocol::FileRef;
use mediadeck_transfer::{ChunkSource, FileSource, target_file_name, validate_file_name};
use mediadeck_upload::{
    ThumbnailFile, UploadError, UploadEvent, UploadOrchestrator, UploadRequest,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::ApiBackend;
use crate::cli::{Command, DirectArgs, FinalizeArgs, UploadArgs};
use crate::config::UploaderConfig;

pub async fn run(command: Command, cfg: UploaderConfig) -> anyhow::Result<()> {
    let credentials = Arc::new(StaticCredentials::new(cfg.token()));
    let client = Arc::new(Client::new(cfg.client_config(), credentials)?);

    match command {
        Command::Upload(args) => upload(client, &cfg, args).await,
        Command::Probe { file_name } => probe(&client, &file_name).await,
        Command::Finalize(args) => finalize(client, &cfg, args).await,
        Command::Direct(args) => direct(&client, args).await,
    }
}

fn orchestrator(client: Arc<Client>, cfg: &UploaderConfig) -> UploadOrchestrator {
    let backend = Arc::new(ApiBackend::new(client, cfg.request_timeout()));
    UploadOrchestrator::new(backend, cfg.upload_config())
}

async fn upload(client: Arc<Client>, cfg: &UploaderConfig, args: UploadArgs) -> anyhow::Result<()> {
    let source = FileSource::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let details = args.details.to_details();
    let stamp = chrono::Utc::now().timestamp_millis().to_string();
    let file_name = args
        .file_name
        .unwrap_or_else(|| target_file_name(&details.title, source.name(), &stamp));
    let thumbnail = match args.thumbnail.as_deref() {
        Some(path) => Some(read_thumbnail(path, &details.title, &stamp).await?),
        None => None,
    };

    info!(
        file = %args.file.display(),
        file_name = %file_name,
        bytes = source.size(),
        kind = %details.kind,
        "starting upload"
    );

    let mut orch = orchestrator(client, cfg);
    let forwarder = orch.take_events().map(|rx| tokio::spawn(log_events(rx)));
    let watcher = tokio::spawn(cancel_on_interrupt(orch.cancel_token()));

    let request = UploadRequest {
        file_name: file_name.clone(),
        details,
        thumbnail,
    };
    let outcome = orch.start_upload(Arc::new(source), request).await;

    watcher.abort();
    drop(orch);
    if let Some(forwarder) = forwarder {
        let _ = forwarder.await;
    }

    match outcome {
        Ok(result) => {
            println!("record {} saved for {}", result.record.id, result.media.file_id);
            Ok(())
        }
        Err(e) => {
            report_failure(&file_name, &e);
            Err(e.into())
        }
    }
}

async fn probe(client: &Client, file_name: &str) -> anyhow::Result<()> {
    let chunks = client.upload_progress(file_name).await?;
    let list: Vec<String> = chunks.iter().map(u32::to_string).collect();
    println!("{file_name}: {} chunk(s) stored [{}]", chunks.len(), list.join(", "));
    Ok(())
}

async fn finalize(
    client: Arc<Client>,
    cfg: &UploaderConfig,
    args: FinalizeArgs,
) -> anyhow::Result<()> {
    let orch = orchestrator(client, cfg);
    let watcher = tokio::spawn(cancel_on_interrupt(orch.cancel_token()));

    let media = FileRef::new(args.media_file_id);
    let thumbnail = args.thumbnail_id.map(FileRef::new);
    let outcome = orch
        .finalize_only(&args.details.to_details(), &media, thumbnail.as_ref())
        .await;
    watcher.abort();

    let record = outcome?;
    println!("record {} saved for {}", record.id, media.file_id);
    Ok(())
}

async fn direct(client: &Client, args: DirectArgs) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    anyhow::ensure!(!data.is_empty(), UploadError::EmptyFile);

    let slot = client.create_video(&args.title).await?;
    info!(video_id = %slot.video_id, bytes = data.len(), "uploading to media host");
    client.put_video(&slot.upload_url, &args.access_key, data).await?;

    println!("video {} uploaded", slot.video_id);
    Ok(())
}

/// Reads a thumbnail and names it `{stamp}_{title}_thumb{.ext}` on the
/// backend, next to the media file of the same upload.
async fn read_thumbnail(path: &Path, title: &str, stamp: &str) -> anyhow::Result<ThumbnailFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading thumbnail {}", path.display()))?;
    let original = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("thumbnail path {} has no file name", path.display()))?;
    let file_name = target_file_name(&format!("{title} thumb"), &original, stamp);
    validate_file_name(&file_name)?;
    Ok(ThumbnailFile { file_name, data })
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling");
        cancel.cancel();
    }
}

async fn log_events(mut rx: UnboundedReceiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Progress {
                file_name,
                percent,
                bytes_per_second,
            } => {
                info!(
                    file_name = %file_name,
                    percent,
                    kib_per_second = (bytes_per_second / 1024.0).round() as u64,
                    "progress"
                );
            }
            UploadEvent::Resumed {
                file_name,
                skipped,
                total,
            } => {
                info!(file_name = %file_name, skipped, total, "backend already has some chunks");
            }
            UploadEvent::StateChanged { file_name, state } => {
                debug!(file_name = %file_name, state = ?state, "state");
            }
            UploadEvent::Completed { .. } | UploadEvent::Failed { .. } => {}
        }
    }
}

fn report_failure(file_name: &str, e: &UploadError) {
    match e {
        UploadError::Finalize {
            media, thumbnail, ..
        } => {
            let thumb = thumbnail
                .as_ref()
                .map(|t| format!(" --thumbnail-id {}", t.file_id))
                .unwrap_or_default();
            eprintln!(
                "media is stored; retry with: mediadeck-uploader finalize --media-file-id {}{thumb} ...",
                media.file_id
            );
        }
        UploadError::Cancelled
        | UploadError::Chunk { .. }
        | UploadError::Probe(_)
        | UploadError::Thumbnail(_)
        | UploadError::IncompleteAssembly { .. } => {
            eprintln!("resume with: mediadeck-uploader upload <FILE> --file-name {file_name} ...");
        }
        _ => {}
    }
}
