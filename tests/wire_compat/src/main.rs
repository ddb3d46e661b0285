fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use mediadeck_protocol::{
        ChunkUploadResponse, CreateVideoRequest, CreateVideoResponse, MediaKind, MetadataRecord,
        MetadataRequest, ProgressResponse, ThumbnailUploadResponse,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_bytes(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        fs::read(&path).unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_slice(&load_bytes(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a request fixture, re-serializes it, and compares the
    /// JSON values (order-independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    // --- Requests ---

    #[test]
    fn fixture_metadata_request_video() {
        let req = roundtrip_test::<MetadataRequest>("metadata_request_video.json");
        assert_eq!(req.media_type, MediaKind::Video);
        assert_eq!(req.thumbnail_id.as_deref(), Some("66f1c0a2e4b0a1b2c3d4e600"));
    }

    #[test]
    fn fixture_metadata_request_reel_without_optionals() {
        let req = roundtrip_test::<MetadataRequest>("metadata_request_reel.json");
        assert_eq!(req.media_type, MediaKind::Reel);
        assert!(req.tags.is_none());
        assert!(req.thumbnail_id.is_none());
    }

    #[test]
    fn fixture_create_video_request() {
        let req = roundtrip_test::<CreateVideoRequest>("create_video_request.json");
        assert_eq!(req.title, "Holiday");
    }

    // --- Responses ---

    #[test]
    fn fixture_chunk_response_accepted() {
        let ack = ChunkUploadResponse::parse(&load_bytes("chunk_response_accepted.json")).unwrap();
        assert!(!ack.is_complete());
        assert!(ack.url.is_none());
    }

    #[test]
    fn fixture_chunk_response_assembled() {
        let ack = ChunkUploadResponse::parse(&load_bytes("chunk_response_assembled.json")).unwrap();
        assert!(ack.is_complete());
        assert_eq!(ack.file.unwrap().file_id, "66f1c0a2e4b0a1b2c3d4e5f6");
        assert!(ack.url.unwrap().ends_with("1718000000000_Holiday.mp4"));
    }

    #[test]
    fn fixture_chunk_response_numeric_id() {
        let ack =
            ChunkUploadResponse::parse(&load_bytes("chunk_response_numeric_id.json")).unwrap();
        assert_eq!(ack.file.unwrap().file_id, "48213");
    }

    #[test]
    fn fixture_thumbnail_response() {
        let thumb = ThumbnailUploadResponse::parse(&load_bytes("thumbnail_response.json")).unwrap();
        assert_eq!(thumb.file.file_id, "66f1c0a2e4b0a1b2c3d4e600");
        assert_eq!(thumb.url, "https://cdn.mediadeck.example/thumbs/cover.jpg");
    }

    #[test]
    fn fixture_progress_response() {
        let chunks = ProgressResponse::parse(&load_bytes("progress_response.json")).unwrap();
        assert_eq!(chunks.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 5]);
    }

    #[test]
    fn fixture_metadata_record_wrapped() {
        let record = MetadataRecord::parse(&load_bytes("metadata_record.json")).unwrap();
        assert_eq!(record.id, "66f1c0a2e4b0a1b2c3d4e700");
        assert_eq!(record.media_file_id.as_deref(), Some("66f1c0a2e4b0a1b2c3d4e5f6"));
        assert_eq!(record.media_type, Some(MediaKind::Video));
        assert_eq!(record.tags, vec!["sea", "sun"]);
        assert!(record.category.unwrap().is_object());
    }

    #[test]
    fn fixture_create_video_response() {
        let slot = CreateVideoResponse::parse(&load_bytes("create_video_response.json")).unwrap();
        assert_eq!(slot.video_id, "0b7c5a3e-2f51-4c1e-9d7a-1f2e3d4c5b6a");
        assert!(slot.upload_url.ends_with(&slot.video_id));
    }

    /// A fixture added without a test above should fail here.
    #[test]
    fn all_fixtures_are_valid_json() {
        let mut count = 0;
        for entry in fs::read_dir(fixtures_dir()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|e| e == "json") {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                load_fixture(&name);
                count += 1;
            }
        }
        assert_eq!(count, 10);
    }
}
