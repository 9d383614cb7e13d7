use std::io::{self, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::compression::{
    create_write_buffer, CompressedWriter, CompressionMethod, FileBufferKind, HashingWriter,
    WriteBufferFromFile, DEFAULT_BUFFER_SIZE,
};
use crate::schema::{
    Checksum, Checksums, DATA_FILE_EXTENSION, MARKS_FILE_EXTENSION, NULL_MAP_EXTENSION,
    NULL_MARKS_FILE_EXTENSION,
};

/// Marks are tiny next to column data
const MARKS_BUFFER_SIZE: usize = 64 * 1024;

/// Compressed writer over the counted, hashed data file
pub type CompressedFileWriter = CompressedWriter<HashingWriter<WriteBufferFromFile>>;

/// What a stream stores; decides the file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Column values or array sizes (`.bin` / `.mrk`)
    Data,
    /// Null map of a nullable column (`.null.bin` / `.null_mrk`)
    NullMap,
}

impl StreamKind {
    /// Extension of the compressed data file
    pub fn data_extension(&self) -> &'static str {
        match self {
            StreamKind::Data => DATA_FILE_EXTENSION,
            StreamKind::NullMap => NULL_MAP_EXTENSION,
        }
    }

    /// Extension of the marks file
    pub fn marks_extension(&self) -> &'static str {
        match self {
            StreamKind::Data => MARKS_FILE_EXTENSION,
            StreamKind::NullMap => NULL_MARKS_FILE_EXTENSION,
        }
    }
}

/// One compressed data file plus its marks file.
///
/// Bytes pass through a [`CompressedWriter`] whose output is counted and
/// hashed before reaching the file. A mark records the compressed file
/// position of the open block together with the offset inside that block.
pub struct ColumnStream {
    file_base: String,
    kind: StreamKind,
    compressed: CompressedFileWriter,
    marks: HashingWriter<WriteBufferFromFile>,
    marks_written: usize,
}

impl ColumnStream {
    /// Create (or truncate) `<file_base><ext>` data and marks files in `dir`
    pub fn create(
        dir: &Path,
        file_base: &str,
        kind: StreamKind,
        compression: CompressionMethod,
        max_compress_block_size: usize,
        estimated_size: u64,
        aio_threshold: u64,
    ) -> io::Result<Self> {
        let data_path = dir.join(format!("{}{}", file_base, kind.data_extension()));
        let marks_path = dir.join(format!("{}{}", file_base, kind.marks_extension()));

        let data_file =
            create_write_buffer(&data_path, estimated_size, aio_threshold, DEFAULT_BUFFER_SIZE)?;
        let marks_file = WriteBufferFromFile::create(&marks_path, MARKS_BUFFER_SIZE)?;

        log::debug!(
            "Created {:?} stream {} ({:?} buffer)",
            kind,
            data_path.display(),
            data_file.kind()
        );

        Ok(Self {
            file_base: file_base.to_string(),
            kind,
            compressed: CompressedWriter::new(
                HashingWriter::new(data_file),
                compression,
                max_compress_block_size,
            ),
            marks: HashingWriter::new(marks_file),
            marks_written: 0,
        })
    }

    /// Escaped base name shared by the data and marks files
    pub fn file_base(&self) -> &str {
        &self.file_base
    }

    /// Stream kind
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Buffering chosen for the data file
    pub fn buffer_kind(&self) -> FileBufferKind {
        self.compressed.get_ref().get_ref().kind()
    }

    /// Number of marks written so far
    pub fn marks_written(&self) -> usize {
        self.marks_written
    }

    /// Writer that serialized values go into
    pub fn data(&mut self) -> &mut CompressedFileWriter {
        &mut self.compressed
    }

    /// Start a new block if the open one holds at least `min_compress_block_size` bytes
    pub fn flush_block_if_needed(&mut self, min_compress_block_size: usize) -> io::Result<()> {
        if self.compressed.offset() >= min_compress_block_size {
            self.compressed.next()?;
        }
        Ok(())
    }

    /// Append a mark for the current position
    pub fn write_mark(&mut self) -> io::Result<()> {
        let compressed_offset = self.compressed.get_ref().count();
        let block_offset = self.compressed.offset() as u64;
        self.marks.write_u64::<LittleEndian>(compressed_offset)?;
        self.marks.write_u64::<LittleEndian>(block_offset)?;
        self.marks_written += 1;
        Ok(())
    }

    /// Roll over a block that ended exactly at the current position
    pub fn next_if_at_end(&mut self) -> io::Result<()> {
        self.compressed.next_if_at_end()
    }

    /// Emit the open block and flush both files
    pub fn finalize(&mut self) -> io::Result<()> {
        self.compressed.next()?;
        self.compressed.flush()?;
        self.marks.flush()
    }

    /// Force both files to stable storage
    pub fn sync(&mut self) -> io::Result<()> {
        self.compressed.get_mut().get_mut().sync()?;
        self.marks.get_mut().sync()
    }

    /// Record the data and marks files in `checksums`. Call after [`finalize`](Self::finalize).
    pub fn add_to_checksums(&self, checksums: &mut Checksums) {
        let plain = self.compressed.get_ref();
        checksums.insert(
            format!("{}{}", self.file_base, self.kind.data_extension()),
            Checksum::compressed(
                plain.count(),
                plain.hash(),
                self.compressed.count(),
                self.compressed.hash(),
            ),
        );
        checksums.insert(
            format!("{}{}", self.file_base, self.kind.marks_extension()),
            Checksum::plain(self.marks.count(), self.marks.hash()),
        );
    }
}
