//! Uploader configuration management.
//!
//! Reads/writes TOML at `~/.config/mediadeck/uploader.toml`. A missing file
//! is created with defaults on first run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use mediadeck_api::{ClientConfig, Endpoints};
use mediadeck_upload::{ThumbnailPolicy, UploadConfig};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `access_token`.
pub const TOKEN_ENV: &str = "MEDIADECK_TOKEN";

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub api_base_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    /// Chunk size in bytes.
    pub chunk_size: u32,
    pub max_in_flight: usize,
    pub request_timeout_secs: u64,
    pub thumbnail: ThumbnailPolicy,
    pub endpoints: Endpoints,
    #[serde(skip)]
    file_path: PathBuf,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        let upload = UploadConfig::default();
        Self {
            api_base_url: "http://localhost:3000".into(),
            access_token: String::new(),
            chunk_size: upload.chunk_size,
            max_in_flight: upload.max_in_flight,
            request_timeout_secs: upload.request_timeout.as_secs(),
            thumbnail: upload.thumbnail,
            endpoints: Endpoints::default(),
            file_path: config_file_path(),
        }
    }
}

impl UploaderConfig {
    /// Loads configuration from `path`, or the default location.
    ///
    /// Writes the defaults when the file does not exist yet. The token from
    /// `MEDIADECK_TOKEN` wins over the file but is never written back.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file_path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);

        let mut config = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("reading {}", file_path.display()))?;
            let mut config: UploaderConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", file_path.display()))?;
            config.file_path = file_path;
            config
        } else {
            let config = UploaderConfig {
                file_path,
                ..Default::default()
            };
            config.save()?;
            tracing::info!(path = %config.file_path.display(), "wrote default configuration");
            config
        };

        config.apply_token_override(std::env::var(TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to disk with owner-only permissions.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.file_path, content)?;
        set_permissions_0600(&self.file_path);

        tracing::debug!(path = %self.file_path.display(), "uploader configuration saved");
        Ok(())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Replaces the file token with `token` when it is set and non-empty.
    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = token.trim().to_string();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be greater than zero");
        anyhow::ensure!(self.max_in_flight > 0, "max_in_flight must be at least 1");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be greater than zero"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token(&self) -> Option<String> {
        (!self.access_token.is_empty()).then(|| self.access_token.clone())
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            chunk_size: self.chunk_size,
            max_in_flight: self.max_in_flight,
            request_timeout: self.request_timeout(),
            thumbnail: self.thumbnail,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            endpoints: self.endpoints.clone(),
            request_timeout: self.request_timeout(),
        }
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_file_path() -> PathBuf {
    config_base_dir().join("mediadeck").join("uploader.toml")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("uploader.toml");

        let mut cfg = UploaderConfig::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.chunk_size, 5 * 1024 * 1024);
        assert_eq!(cfg.max_in_flight, 1);
        assert_eq!(cfg.endpoints, Endpoints::default());

        // The env token may be set on the test machine; compare file fields only.
        cfg.access_token.clear();
        let mut reloaded = UploaderConfig::load(Some(&path)).unwrap();
        reloaded.access_token.clear();
        assert_eq!(cfg, reloaded);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploader.toml");
        UploaderConfig::load(Some(&path)).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploader.toml");
        std::fs::write(
            &path,
            r#"
api_base_url = "https://dash.example"
max_in_flight = 4
thumbnail = "required"

[endpoints]
reel_metadata = "/v2/reels"
"#,
        )
        .unwrap();

        let cfg = UploaderConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.api_base_url, "https://dash.example");
        assert_eq!(cfg.max_in_flight, 4);
        assert_eq!(cfg.thumbnail, ThumbnailPolicy::Required);
        assert_eq!(cfg.endpoints.reel_metadata, "/v2/reels");
        assert_eq!(cfg.endpoints.upload, Endpoints::default().upload);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uploader.toml");
        std::fs::write(&path, "chunk_size = 0\n").unwrap();
        assert!(UploaderConfig::load(Some(&path)).is_err());

        std::fs::write(&path, "chunk_size = \"big\"\n").unwrap();
        assert!(UploaderConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn token_override() {
        let mut cfg = UploaderConfig {
            access_token: "from-file".into(),
            ..Default::default()
        };
        cfg.apply_token_override(None);
        assert_eq!(cfg.token().as_deref(), Some("from-file"));

        cfg.apply_token_override(Some("  ".into()));
        assert_eq!(cfg.token().as_deref(), Some("from-file"));

        cfg.apply_token_override(Some("from-env\n".into()));
        assert_eq!(cfg.token().as_deref(), Some("from-env"));
    }

    #[test]
    fn upload_config_mirrors_file() {
        let cfg = UploaderConfig {
            chunk_size: 1024,
            max_in_flight: 2,
            request_timeout_secs: 5,
            ..Default::default()
        };
        let upload = cfg.upload_config();
        assert_eq!(upload.chunk_size, 1024);
        assert_eq!(upload.max_in_flight, 2);
        assert_eq!(upload.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.client_config().request_timeout, Duration::from_secs(5));
        assert!(UploaderConfig::default().token().is_none());
    }
}
