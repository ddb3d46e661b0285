//! Chunked upload bookkeeping: planning, byte sources and progress.
//!
//! Nothing in this crate touches the network. The orchestrator in
//! `mediadeck-upload` drives these types; the backend is the only source of
//! truth for which chunks have been received.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{Chunk, ChunkPlan, ChunkSource, FileSource, MemorySource, plan};
pub use progress::{SpeedCalculator, percent_complete};
pub use types::UploadTarget;
pub use validation::{sanitize_title, target_file_name, validate_file_name};

/// Default chunk size for videos and reels: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 5 * 1024 * 1024;

/// Large chunk variant used by some upload forms: 20 MiB.
pub const LARGE_CHUNK_SIZE: u32 = 20 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("file of {file_size} bytes needs more than u32::MAX chunks")]
    TooManyChunks { file_size: u64 },

    #[error("chunk {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}
