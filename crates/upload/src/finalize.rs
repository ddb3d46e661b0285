//! Metadata finalizer: registers the catalog record for an assembled file.

use mediadeck_protocol::{FileRef, MetadataRecord, MetadataRequest};
use tracing::debug;

use crate::backend::UploadBackend;
use crate::error::BackendError;
use crate::types::MediaDetails;

/// Builds the metadata body for an assembled media file.
pub fn build_metadata(
    details: &MediaDetails,
    media: &FileRef,
    thumbnail: Option<&FileRef>,
) -> MetadataRequest {
    MetadataRequest {
        title: details.title.clone(),
        description: details.description.clone(),
        category: details.category.clone(),
        tags: (!details.tags.is_empty()).then(|| details.tags.clone()),
        media_file_id: media.file_id.clone(),
        thumbnail_id: thumbnail.map(|t| t.file_id.clone()),
        media_type: details.kind,
    }
}

/// Posts the catalog record. Fire-once: the caller decides about retries.
///
/// Must only be called once the backend has produced `media`.
pub async fn finalize(
    backend: &dyn UploadBackend,
    details: &MediaDetails,
    media: &FileRef,
    thumbnail: Option<&FileRef>,
) -> Result<MetadataRecord, BackendError> {
    debug_assert!(!media.file_id.is_empty(), "finalize without a media file id");
    let request = build_metadata(details, media, thumbnail);
    debug!(media_file_id = %media.file_id, media_type = %details.kind, "saving metadata");
    backend.create_metadata(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadeck_protocol::MediaKind;

    fn details(tags: Vec<String>) -> MediaDetails {
        MediaDetails {
            title: "Clip".into(),
            description: "desc".into(),
            category: "music".into(),
            tags,
            kind: MediaKind::Reel,
        }
    }

    #[test]
    fn metadata_without_optional_fields() {
        let req = build_metadata(&details(vec![]), &FileRef::new("abc"), None);
        assert_eq!(req.media_file_id, "abc");
        assert!(req.tags.is_none());
        assert!(req.thumbnail_id.is_none());
        assert_eq!(req.media_type, MediaKind::Reel);
    }

    #[test]
    fn metadata_with_tags_and_thumbnail() {
        let req = build_metadata(
            &details(vec!["a".into(), "b".into()]),
            &FileRef::new("abc"),
            Some(&FileRef::new("t1")),
        );
        assert_eq!(req.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(req.thumbnail_id.as_deref(), Some("t1"));
    }
}
