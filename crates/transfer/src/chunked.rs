use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::TransferError;

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Returns `ceil(file_size / chunk_size)`.
///
/// A zero-byte file yields zero chunks.
pub fn plan(file_size: u64, chunk_size: u32) -> Result<u32, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    let total = file_size.div_ceil(u64::from(chunk_size));
    u32::try_from(total).map_err(|_| TransferError::TooManyChunks { file_size })
}

/// Byte range `[start, end)` of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: u32,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    /// Length of the chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Fixed chunk layout of one file. `total_chunks` is computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u32,
    total_chunks: u32,
}

impl ChunkPlan {
    pub fn new(file_size: u64, chunk_size: u32) -> Result<Self, TransferError> {
        let total_chunks = plan(file_size, chunk_size)?;
        Ok(Self {
            file_size,
            chunk_size,
            total_chunks,
        })
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Returns the byte range of chunk `index`.
    pub fn chunk(&self, index: u32) -> Result<Chunk, TransferError> {
        if index >= self.total_chunks {
            return Err(TransferError::ChunkOutOfRange {
                index,
                total: self.total_chunks,
            });
        }
        let start = u64::from(index) * u64::from(self.chunk_size);
        let end = std::cmp::min(start + u64::from(self.chunk_size), self.file_size);
        Ok(Chunk { index, start, end })
    }

    /// Iterates every chunk in index order.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        (0..self.total_chunks).filter_map(|i| self.chunk(i).ok())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A byte-addressable media file selected by the user.
pub trait ChunkSource: Send + Sync {
    /// Original file name, used to preserve the extension.
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads bytes `[start, end)`.
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, TransferError>;

    /// Reads the bytes of one planned chunk.
    fn read_chunk(&self, chunk: &Chunk) -> Result<Vec<u8>, TransferError> {
        self.read_range(chunk.start, chunk.end)
    }
}

/// File on disk, read with seek + exact reads.
pub struct FileSource {
    file: Mutex<std::fs::File>,
    name: String,
    size: u64,
}

impl FileSource {
    /// Opens `path` for ranged reads.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidFileName(path.display().to_string()))?;
        Ok(Self {
            file: Mutex::new(file),
            name,
            size,
        })
    }
}

impl ChunkSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, TransferError> {
        let end = end.min(self.size);
        if start >= end {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; (end - start) as usize];
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// In-memory file, mostly for tests and small payloads.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl ChunkSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, TransferError> {
        let len = self.data.len();
        let start = (start as usize).min(len);
        let end = (end as usize).min(len);
        Ok(self.data.get(start..end).unwrap_or_default().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MIB: u64 = 1024 * 1024;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn plan_rounds_up() {
        assert_eq!(plan(10, 4).unwrap(), 3);
        assert_eq!(plan(8, 4).unwrap(), 2);
        assert_eq!(plan(1, 4).unwrap(), 1);
        assert_eq!(plan(12 * MIB, 5 * MIB as u32).unwrap(), 3);
    }

    #[test]
    fn plan_zero_size_is_zero_chunks() {
        assert_eq!(plan(0, 4).unwrap(), 0);
    }

    #[test]
    fn plan_rejects_zero_chunk_size() {
        assert!(matches!(plan(10, 0), Err(TransferError::InvalidChunkSize)));
    }

    #[test]
    fn plan_rejects_overflowing_chunk_count() {
        let err = plan(u64::MAX, 1).unwrap_err();
        assert!(matches!(err, TransferError::TooManyChunks { .. }));
    }

    #[test]
    fn plan_matches_ceil_for_many_sizes() {
        for chunk_size in [1u32, 3, 7, 64, 1000] {
            for file_size in 0u64..500 {
                let total = plan(file_size, chunk_size).unwrap();
                let expected = (file_size as f64 / f64::from(chunk_size)).ceil() as u32;
                assert_eq!(total, expected, "size {file_size} chunk {chunk_size}");
                assert_eq!(total == 0, file_size == 0);
            }
        }
    }

    #[test]
    fn chunks_cover_file_contiguously() {
        for chunk_size in [1u32, 4, 9, 100] {
            for file_size in [0u64, 1, 8, 9, 10, 99, 100, 101, 1000] {
                let plan = ChunkPlan::new(file_size, chunk_size).unwrap();
                let mut expected_start = 0;
                for chunk in plan.chunks() {
                    let index = u64::from(chunk.index);
                    assert_eq!(chunk.start, index * u64::from(chunk_size));
                    assert_eq!(
                        chunk.end,
                        ((index + 1) * u64::from(chunk_size)).min(file_size)
                    );
                    assert_eq!(chunk.start, expected_start);
                    assert!(!chunk.is_empty());
                    expected_start = chunk.end;
                }
                assert_eq!(expected_start, file_size);
                assert_eq!(plan.chunks().count() as u32, plan.total_chunks());
            }
        }
    }

    #[test]
    fn twelve_mib_in_five_mib_chunks() {
        let plan = ChunkPlan::new(12 * MIB, 5 * MIB as u32).unwrap();
        let sizes: Vec<u64> = plan.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![5 * MIB, 5 * MIB, 2 * MIB]);
    }

    #[test]
    fn chunk_out_of_range() {
        let plan = ChunkPlan::new(10, 4).unwrap();
        assert!(plan.chunk(2).is_ok());
        assert!(matches!(
            plan.chunk(3),
            Err(TransferError::ChunkOutOfRange { index: 3, total: 3 })
        ));
    }

    #[test]
    fn file_source_reads_ranges() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "clip.mp4", b"AABBCCDDEE");

        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.size(), 10);
        assert_eq!(source.name(), "clip.mp4");

        let plan = ChunkPlan::new(source.size(), 4).unwrap();
        let parts: Vec<Vec<u8>> = plan
            .chunks()
            .map(|c| source.read_chunk(&c).unwrap())
            .collect();
        assert_eq!(parts, vec![b"AABB".to_vec(), b"CCDD".to_vec(), b"EE".to_vec()]);

        // Out-of-order reads are fine.
        assert_eq!(source.read_range(8, 10).unwrap(), b"EE");
        assert_eq!(source.read_range(0, 2).unwrap(), b"AA");
    }

    #[test]
    fn file_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = FileSource::open(&dir.path().join("missing.mp4"));
        assert!(matches!(result, Err(TransferError::Io(_))));
    }

    #[test]
    fn memory_source_clamps_ranges() {
        let source = MemorySource::new("a.mp4", b"0123456789".to_vec());
        assert_eq!(source.read_range(6, 100).unwrap(), b"6789");
        assert!(source.read_range(20, 30).unwrap().is_empty());
    }
}
