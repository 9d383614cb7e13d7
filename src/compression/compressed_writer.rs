use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use xxhash_rust::xxh3::Xxh3;

use super::codec::CompressionMethod;
use super::hashing::hash_bytes;

/// Size of the per-block header: method byte, compressed size, uncompressed size
pub const BLOCK_HEADER_SIZE: usize = 9;

/// Size of the checksum that precedes every block header
pub const BLOCK_CHECKSUM_SIZE: usize = 16;

/// Buffered writer that cuts its input into independently compressed blocks.
///
/// Uncompressed bytes accumulate in an open block of at most `max_block_size`
/// bytes. A block is emitted when the caller asks for it with [`next`] or when
/// more data arrives while the open block is full. Each emitted block is
/// framed as:
///
/// ```text
/// [checksum: 16][method: 1][compressed size incl. header: u32][uncompressed size: u32][payload]
/// ```
///
/// The writer also tracks the total uncompressed byte count and a rolling hash
/// of the uncompressed content.
///
/// [`next`]: CompressedWriter::next
pub struct CompressedWriter<W: Write> {
    inner: W,
    method: CompressionMethod,
    buffer: Vec<u8>,
    max_block_size: usize,
    scratch: Vec<u8>,
    hasher: Xxh3,
    count: u64,
}

impl<W: Write> CompressedWriter<W> {
    /// Create a writer emitting blocks of at most `max_block_size` uncompressed bytes
    pub fn new(inner: W, method: CompressionMethod, max_block_size: usize) -> Self {
        let max_block_size = max_block_size.max(1);
        Self {
            inner,
            method,
            buffer: Vec::with_capacity(max_block_size),
            max_block_size,
            scratch: Vec::new(),
            hasher: Xxh3::new(),
            count: 0,
        }
    }

    /// Offset within the currently open (not yet emitted) block
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Total uncompressed bytes written, including the open block
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Hash of the uncompressed content written so far
    pub fn hash(&self) -> u128 {
        self.hasher.digest128()
    }

    /// Whether the open block is exactly full
    pub fn is_at_end(&self) -> bool {
        self.buffer.len() == self.max_block_size
    }

    /// Emit the open block, if it holds any data.
    pub fn next(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.resize(BLOCK_HEADER_SIZE, 0);
        self.method.compress_into(&self.buffer, &mut self.scratch)?;

        let compressed_size = u32::try_from(self.scratch.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "compressed block exceeds 4 GiB")
        })?;
        let uncompressed_size = u32::try_from(self.buffer.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "uncompressed block exceeds 4 GiB")
        })?;

        {
            let mut header = &mut self.scratch[..BLOCK_HEADER_SIZE];
            header.write_u8(self.method.method_byte())?;
            header.write_u32::<LittleEndian>(compressed_size)?;
            header.write_u32::<LittleEndian>(uncompressed_size)?;
        }

        let checksum = hash_bytes(&self.scratch);
        self.inner.write_u128::<LittleEndian>(checksum)?;
        self.inner.write_all(&self.scratch)?;

        self.buffer.clear();
        Ok(())
    }

    /// Emit the open block only if it is exactly full.
    ///
    /// After this call the current position is never the end of a block, so a
    /// mark taken here points at the start of the following block instead.
    pub fn next_if_at_end(&mut self) -> io::Result<()> {
        if self.is_at_end() {
            self.next()?;
        }
        Ok(())
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            if self.is_at_end() {
                self.next()?;
            }
            let room = self.max_block_size - self.buffer.len();
            let take = room.min(remaining.len());
            self.buffer.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
        }

        self.hasher.update(buf);
        self.count += buf.len() as u64;
        Ok(buf.len())
    }

    /// Flushes the underlying writer only; the open block stays open.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::codec::METHOD_BYTE_NONE;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    fn block_headers(data: &[u8]) -> Vec<(u8, u32, u32)> {
        let mut cursor = Cursor::new(data);
        let mut headers = Vec::new();
        while (cursor.position() as usize) < data.len() {
            cursor.read_u128::<LittleEndian>().unwrap();
            let method = cursor.read_u8().unwrap();
            let compressed = cursor.read_u32::<LittleEndian>().unwrap();
            let uncompressed = cursor.read_u32::<LittleEndian>().unwrap();
            let skip = compressed as u64 - BLOCK_HEADER_SIZE as u64;
            cursor.set_position(cursor.position() + skip);
            headers.push((method, compressed, uncompressed));
        }
        headers
    }

    #[test]
    fn test_explicit_next_emits_block() {
        let mut writer = CompressedWriter::new(Vec::new(), CompressionMethod::None, 1024);
        writer.write_all(b"abcdef").unwrap();
        assert_eq!(writer.offset(), 6);
        assert!(writer.get_ref().is_empty());

        writer.next().unwrap();
        assert_eq!(writer.offset(), 0);
        assert_eq!(writer.count(), 6);

        let out = writer.get_ref();
        assert_eq!(out.len(), BLOCK_CHECKSUM_SIZE + BLOCK_HEADER_SIZE + 6);
        assert_eq!(&out[BLOCK_CHECKSUM_SIZE + BLOCK_HEADER_SIZE..], b"abcdef");
        assert_eq!(
            block_headers(out),
            vec![(METHOD_BYTE_NONE, (BLOCK_HEADER_SIZE + 6) as u32, 6)]
        );
    }

    #[test]
    fn test_full_block_is_kept_open_until_more_data() {
        let mut writer = CompressedWriter::new(Vec::new(), CompressionMethod::None, 4);
        writer.write_all(b"abcd").unwrap();
        assert!(writer.is_at_end());
        assert!(writer.get_ref().is_empty());

        writer.write_all(b"e").unwrap();
        assert_eq!(writer.offset(), 1);
        assert_eq!(block_headers(writer.get_ref()).len(), 1);
    }

    #[test]
    fn test_next_if_at_end_only_rolls_full_blocks() {
        let mut writer = CompressedWriter::new(Vec::new(), CompressionMethod::None, 4);
        writer.write_all(b"abc").unwrap();
        writer.next_if_at_end().unwrap();
        assert_eq!(writer.offset(), 3);

        writer.write_all(b"d").unwrap();
        writer.next_if_at_end().unwrap();
        assert_eq!(writer.offset(), 0);
        assert_eq!(block_headers(writer.get_ref()), vec![(METHOD_BYTE_NONE, 13, 4)]);
    }

    #[test]
    fn test_large_write_spans_blocks() {
        let mut writer = CompressedWriter::new(Vec::new(), CompressionMethod::Lz4, 100);
        let data: Vec<u8> = (0..250u32).map(|i| (i % 7) as u8).collect();
        writer.write_all(&data).unwrap();
        writer.next().unwrap();

        let sizes: Vec<u32> = block_headers(writer.get_ref())
            .into_iter()
            .map(|(_, _, uncompressed)| uncompressed)
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(writer.count(), 250);
        assert_eq!(writer.hash(), hash_bytes(&data));
    }

    #[test]
    fn test_next_on_empty_block_is_noop() {
        let mut writer = CompressedWriter::new(Vec::new(), CompressionMethod::Zstd(1), 16);
        writer.next().unwrap();
        assert!(writer.get_ref().is_empty());
    }
}
