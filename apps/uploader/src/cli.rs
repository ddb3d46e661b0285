//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mediadeck_protocol::MediaKind;
use mediadeck_upload::MediaDetails;

#[derive(Debug, Parser)]
#[command(name = "mediadeck-uploader", version, about = "Upload videos and reels to MediaDeck")]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/mediadeck/uploader.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a media file in chunks, resuming if the backend has some already.
    Upload(UploadArgs),
    /// Show which chunks the backend stores for a file name.
    Probe {
        file_name: String,
    },
    /// Save the catalog record for media that is already uploaded.
    Finalize(FinalizeArgs),
    /// Upload a whole file to the external media host.
    Direct(DirectArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub file: PathBuf,

    #[command(flatten)]
    pub details: DetailsArgs,

    /// Thumbnail image for the record.
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,

    /// Backend file name of an earlier attempt to resume.
    #[arg(long)]
    pub file_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct FinalizeArgs {
    #[arg(long)]
    pub media_file_id: String,

    #[arg(long)]
    pub thumbnail_id: Option<String>,

    #[command(flatten)]
    pub details: DetailsArgs,
}

#[derive(Debug, Args)]
pub struct DirectArgs {
    pub file: PathBuf,

    #[arg(long)]
    pub title: String,

    /// Key authorizing the upload slot on the media host.
    #[arg(long)]
    pub access_key: String,
}

#[derive(Debug, Args)]
pub struct DetailsArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub category: String,

    /// Comma-separated tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, value_enum, default_value_t = KindArg::Video)]
    pub kind: KindArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Video,
    Reel,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => MediaKind::Video,
            KindArg::Reel => MediaKind::Reel,
        }
    }
}

impl DetailsArgs {
    pub fn to_details(&self) -> MediaDetails {
        MediaDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: self
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            kind: self.kind.into(),
        }
    }
}
