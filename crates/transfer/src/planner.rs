use std::io::SeekFrom;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;
use crate::types::{FileContent, FileDescriptor, SelectedFile};

/// Byte range of one chunk of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// 1-based position of the file in the plan.
    pub file_index: usize,
    /// 1-based chunk number within the file.
    pub chunk_number: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (exclusive).
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Chunk layout of a single file.
///
/// The server distinguishes a file sent in one request from a file sent as
/// a sequence of chunks, so the planner keeps the two cases apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLayout {
    /// The file fits in one chunk and is sent as a whole.
    Whole(ChunkRange),
    /// The file is split into two or more chunks.
    Chunked(Vec<ChunkRange>),
}

impl ChunkLayout {
    /// All ranges in ascending chunk order.
    pub fn ranges(&self) -> &[ChunkRange] {
        match self {
            ChunkLayout::Whole(range) => std::slice::from_ref(range),
            ChunkLayout::Chunked(ranges) => ranges,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.ranges().len()
    }

    pub fn is_whole(&self) -> bool {
        matches!(self, ChunkLayout::Whole(_))
    }
}

/// Computes the chunk layout of `file` for the given chunk size.
///
/// Files no larger than `chunk_size` (including empty files) yield a single
/// whole-file range. Larger files yield `ceil(size / chunk_size)` contiguous
/// ranges numbered from 1 that cover `[0, size)` exactly once.
pub fn plan(
    file_index: usize,
    file: &FileDescriptor,
    chunk_size: u64,
) -> Result<ChunkLayout, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }

    let size = file.size_bytes;
    if size <= chunk_size {
        return Ok(ChunkLayout::Whole(ChunkRange {
            file_index,
            chunk_number: 1,
            start: 0,
            end: size,
        }));
    }

    let count = size.div_ceil(chunk_size);
    let ranges = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            ChunkRange {
                file_index,
                chunk_number: i as usize + 1,
                start,
                end: (start + chunk_size).min(size),
            }
        })
        .collect();
    Ok(ChunkLayout::Chunked(ranges))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

enum Source {
    Disk(tokio::fs::File),
    Memory(Arc<[u8]>),
}

/// Reads exact byte ranges out of a selected file.
pub struct ChunkReader {
    source: Source,
    path: String,
    size: u64,
}

impl ChunkReader {
    /// Opens the content of `file` for range reads.
    pub async fn open(file: &SelectedFile) -> Result<Self, TransferError> {
        let source = match &file.content {
            FileContent::Disk(path) => Source::Disk(tokio::fs::File::open(path).await?),
            FileContent::Memory(data) => Source::Memory(Arc::clone(data)),
        };
        Ok(Self {
            source,
            path: file.upload_path(),
            size: file.size,
        })
    }

    /// Reads the bytes of `range`.
    pub async fn read(&mut self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        if range.start > range.end || range.end > self.size {
            return Err(TransferError::RangeOutOfBounds {
                path: self.path.clone(),
                start: range.start,
                end: range.end,
                size: self.size,
            });
        }

        match &mut self.source {
            Source::Disk(file) => {
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buf = vec![0u8; range.len() as usize];
                file.read_exact(&mut buf).await?;
                Ok(buf)
            }
            Source::Memory(data) => Ok(data[range.start as usize..range.end as usize].to_vec()),
        }
    }

    /// Total size of the underlying file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn descriptor(size: u64) -> FileDescriptor {
        FileDescriptor {
            path: "report.csv".into(),
            mime_type: "text/csv".into(),
            size_bytes: size,
        }
    }

    fn assert_partition(layout: &ChunkLayout, size: u64, chunk_size: u64) {
        let ranges = layout.ranges();
        assert!(!ranges.is_empty());
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[ranges.len() - 1].end, size);
        for (i, r) in ranges.iter().enumerate() {
            assert_eq!(r.chunk_number, i + 1);
            assert!(r.len() <= chunk_size);
            if i > 0 {
                assert_eq!(ranges[i - 1].end, r.start, "ranges must be contiguous");
            }
        }
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(matches!(
            plan(1, &descriptor(10), 0),
            Err(TransferError::ZeroChunkSize)
        ));
    }

    #[test]
    fn empty_file_is_single_whole_chunk() {
        let layout = plan(1, &descriptor(0), 4).unwrap();
        assert!(layout.is_whole());
        assert_eq!(
            layout.ranges(),
            &[ChunkRange {
                file_index: 1,
                chunk_number: 1,
                start: 0,
                end: 0
            }]
        );
    }

    #[test]
    fn file_equal_to_chunk_size_is_whole() {
        let layout = plan(2, &descriptor(4), 4).unwrap();
        assert!(layout.is_whole());
        assert_eq!(layout.ranges()[0].file_index, 2);
        assert_eq!(layout.ranges()[0].end, 4);
    }

    #[test]
    fn two_and_a_half_chunks() {
        let c = 1000;
        let layout = plan(1, &descriptor(2500), c).unwrap();
        assert!(!layout.is_whole());
        let bounds: Vec<(u64, u64)> = layout.ranges().iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(bounds, vec![(0, 1000), (1000, 2000), (2000, 2500)]);
    }

    #[test]
    fn ranges_partition_file_for_many_sizes() {
        for chunk_size in [1u64, 2, 3, 7, 64] {
            for size in 0u64..200 {
                let layout = plan(1, &descriptor(size), chunk_size).unwrap();
                assert_partition(&layout, size, chunk_size);
                let expected = if size <= chunk_size {
                    1
                } else {
                    size.div_ceil(chunk_size) as usize
                };
                assert_eq!(layout.chunk_count(), expected, "size {size} chunk {chunk_size}");
            }
        }
    }

    #[tokio::test]
    async fn memory_reader_slices_exact_ranges() {
        let file = SelectedFile::from_bytes("a.bin", None, "", b"AABBCCDDEE".to_vec());
        let layout = plan(1, &describe(&file), 4).unwrap();
        let mut reader = ChunkReader::open(&file).await.unwrap();

        let mut out = Vec::new();
        for range in layout.ranges() {
            out.push(reader.read(range).await.unwrap());
        }
        assert_eq!(out, vec![b"AABB".to_vec(), b"CCDD".to_vec(), b"EE".to_vec()]);
    }

    #[tokio::test]
    async fn disk_reader_reads_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"0123456789")
            .unwrap();

        let file = SelectedFile {
            name: "data.bin".into(),
            relative_path: Some(String::new()),
            mime_type: String::new(),
            size: 10,
            content: FileContent::Disk(path),
        };
        let mut reader = ChunkReader::open(&file).await.unwrap();
        assert_eq!(reader.size(), 10);

        let tail = ChunkRange {
            file_index: 1,
            chunk_number: 2,
            start: 6,
            end: 10,
        };
        let head = ChunkRange {
            file_index: 1,
            chunk_number: 1,
            start: 0,
            end: 6,
        };
        assert_eq!(reader.read(&tail).await.unwrap(), b"6789");
        assert_eq!(reader.read(&head).await.unwrap(), b"012345");
    }

    #[tokio::test]
    async fn reader_rejects_range_past_end() {
        let file = SelectedFile::from_bytes("a.bin", None, "", b"abc".to_vec());
        let mut reader = ChunkReader::open(&file).await.unwrap();
        let range = ChunkRange {
            file_index: 1,
            chunk_number: 1,
            start: 0,
            end: 4,
        };
        assert!(matches!(
            reader.read(&range).await,
            Err(TransferError::RangeOutOfBounds { size: 3, .. })
        ));
    }

    fn describe(file: &SelectedFile) -> FileDescriptor {
        crate::describe_selection(std::slice::from_ref(file))
            .unwrap()
            .remove(0)
    }
}
