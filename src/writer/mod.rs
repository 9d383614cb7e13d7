//! # Part Writer Module
//!
//! This module turns sorted row batches into an immutable on-disk part.
//!
//! ## Design Principles
//!
//! 1. **Streaming Architecture**: A part is written across any number of
//!    batches. A granule left open at the end of one batch is continued by the
//!    next, so the mark layout does not depend on how rows were split.
//!
//! 2. **One Stream per Physical Column**: Every scalar column, every null map
//!    and every array nesting level has its own compressed data file and
//!    marks file. Sibling arrays of one nested structure share their sizes.
//!
//! 3. **Marks at Block Starts**: Before each mark a sufficiently large block
//!    is closed, and a block that ends exactly at a granule boundary is rolled
//!    over, so a mark never points at the end of a block.
//!
//! 4. **Single Finalization**: `finish` consumes the writer and returns the
//!    checksum manifest of everything it wrote.
//!
//! ## Writers
//!
//! - [`MergedPartWriter`]: new part with primary index, `columns.txt` and
//!   `checksums.txt`; removes the directory if no rows were written
//! - [`ColumnOnlyWriter`]: extra columns for an existing part

mod column_only;
mod config;
mod core;
mod error;
mod part_writer;
mod stats;
mod stream;


pub use column_only::ColumnOnlyWriter;
pub use config::{MergeMode, Storage, WriterConfig};
pub use self::core::{next_index_offset, plan_granules, Granule, PartWriterCore};
pub use error::WriterError;
pub use part_writer::{FinishedPart, MergedPartWriter};
pub use stats::WriterStats;
pub use stream::{ColumnStream, CompressedFileWriter, StreamKind};
