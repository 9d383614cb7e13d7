use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write buffer used for streams whose estimated size crosses the direct I/O threshold
pub const DIRECT_IO_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default write buffer for plain files
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// How a plain file is buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileBufferKind {
    /// Ordinary buffered writes
    Buffered,
    /// Large, block-aligned buffer for big sequential streams
    Direct,
}

/// Buffered plain file opened with create + truncate semantics.
pub struct WriteBufferFromFile {
    path: PathBuf,
    kind: FileBufferKind,
    writer: BufWriter<File>,
}

impl WriteBufferFromFile {
    /// Create (or truncate) `path` with a buffer of `buffer_size` bytes
    pub fn create<P: AsRef<Path>>(path: P, buffer_size: usize) -> io::Result<Self> {
        Self::create_with_kind(path, buffer_size, FileBufferKind::Buffered)
    }

    fn create_with_kind<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
        kind: FileBufferKind,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            kind,
            writer: BufWriter::with_capacity(buffer_size.max(1), file),
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffering mode chosen for this file
    pub fn kind(&self) -> FileBufferKind {
        self.kind
    }

    /// Flush buffered bytes and force file data to stable storage
    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }
}

impl Write for WriteBufferFromFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Open a plain file for a column stream.
///
/// When `aio_threshold` is non-zero and the estimated stream size reaches it,
/// the file gets the large direct I/O buffer; otherwise an ordinary buffer of
/// `buffer_size` bytes.
pub fn create_write_buffer<P: AsRef<Path>>(
    path: P,
    estimated_size: u64,
    aio_threshold: u64,
    buffer_size: usize,
) -> io::Result<WriteBufferFromFile> {
    if aio_threshold > 0 && estimated_size >= aio_threshold {
        log::debug!(
            "Using direct I/O buffer for {} (estimated {} bytes, threshold {})",
            path.as_ref().display(),
            estimated_size,
            aio_threshold
        );
        WriteBufferFromFile::create_with_kind(
            path,
            DIRECT_IO_BUFFER_SIZE.max(buffer_size),
            FileBufferKind::Direct,
        )
    } else {
        WriteBufferFromFile::create_with_kind(path, buffer_size, FileBufferKind::Buffered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_threshold_selects_direct_buffer() {
        let dir = tempdir().unwrap();

        let small = create_write_buffer(dir.path().join("a.bin"), 10, 100, 4096).unwrap();
        assert_eq!(small.kind(), FileBufferKind::Buffered);

        let large = create_write_buffer(dir.path().join("b.bin"), 100, 100, 4096).unwrap();
        assert_eq!(large.kind(), FileBufferKind::Direct);

        let disabled = create_write_buffer(dir.path().join("c.bin"), u64::MAX, 0, 4096).unwrap();
        assert_eq!(disabled.kind(), FileBufferKind::Buffered);
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stale.bin");
        std::fs::write(&path, b"garbage from a previous run").unwrap();

        let mut file = WriteBufferFromFile::create(&path, 16).unwrap();
        file.write_all(b"ok").unwrap();
        file.sync().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"ok");
    }
}
