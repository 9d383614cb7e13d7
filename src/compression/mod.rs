//! # Block Compression and Hashing
//!
//! Building blocks for column stream files:
//!
//! - [`CompressionMethod`]: codec selection (none, LZ4, ZSTD, deflate)
//! - [`CompressedWriter`]: splits a byte stream into framed, independently
//!   compressed blocks and exposes the offset inside the open block
//! - [`HashingWriter`]: byte counter + rolling XXH3-128 hash used for the
//!   checksum manifest
//! - [`WriteBufferFromFile`]: create/truncate plain file with buffering chosen
//!   from the direct I/O threshold

mod codec;
mod compressed_writer;
mod file;
mod hashing;

pub use codec::{
    CompressionMethod, METHOD_BYTE_DEFLATE, METHOD_BYTE_LZ4, METHOD_BYTE_NONE, METHOD_BYTE_ZSTD,
};
pub use compressed_writer::{CompressedWriter, BLOCK_CHECKSUM_SIZE, BLOCK_HEADER_SIZE};
pub use file::{
    create_write_buffer, FileBufferKind, WriteBufferFromFile, DEFAULT_BUFFER_SIZE,
    DIRECT_IO_BUFFER_SIZE,
};
pub use hashing::{hash_bytes, HashingWriter};
