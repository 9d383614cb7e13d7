//! # mergepart - Part Writer for Sorted-Merge Column Storage
//!
//! `mergepart` writes immutable, column-oriented data parts of the kind used by
//! sorted-merge table engines. Every physical column lands in its own
//! compressed data file with a sparse marks file that lets a reader seek to
//! any granule of rows without decompressing what comes before it.
//!
//! ## Key Features
//!
//! - **Streaming Writes**: a part is filled from any number of Arrow
//!   [`RecordBatch`](arrow::record_batch::RecordBatch)es. The on-disk bytes do
//!   not depend on how the rows were split into batches.
//!
//! - **Sparse Marks**: one mark per granule of `index_granularity` rows, each
//!   pointing at a compressed block start plus an offset inside the
//!   decompressed block.
//!
//! - **Nested Columns**: `Array(T)` columns of one nested structure share
//!   their sizes streams; `Nullable(T)` columns get a separate null map.
//!
//! - **Primary Index and Manifest**: the sort key of every granule's first row
//!   goes to `primary.idx`; sizes and XXH3-128 hashes of every file go to
//!   `checksums.txt`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arrow::array::{StringArray, UInt64Array};
//! use arrow::record_batch::RecordBatch;
//! use mergepart::prelude::*;
//!
//! let columns = NamesAndTypesList::new()
//!     .with("id", ColumnType::Scalar(ScalarType::UInt64))
//!     .with("name", ColumnType::Scalar(ScalarType::String));
//! let storage = Storage::new(columns, SortDescription::by_names(["id"]));
//!
//! let mut writer = MergedPartWriter::new(&storage, "table/all_1_1_0", storage.columns.clone())?;
//!
//! let batch = RecordBatch::try_from_iter([
//!     ("id", Arc::new(UInt64Array::from(vec![1, 2, 3])) as _),
//!     ("name", Arc::new(StringArray::from(vec!["a", "b", "c"])) as _),
//! ])?;
//! writer.write(&batch)?;
//!
//! let part = writer.finish()?;
//! println!("{}", part.stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates a part directory:
//! ```text
//! table/all_1_1_0/
//! ├── id.bin, id.mrk          # compressed values + marks
//! ├── name.bin, name.mrk
//! ├── primary.idx             # key of the first row of every granule
//! ├── columns.txt             # column names and types
//! └── checksums.txt           # size and hash of every file
//! ```
//!
//! ## Architecture
//!
//! - [`compression`]: block codecs, framed compressed writer, hashing writer,
//!   file buffers
//! - [`schema`]: column types, column lists, checksum manifests, stream naming
//!   and binary value serialization
//! - [`writer`]: column streams, granule planning and the part writers

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod compression;
pub mod schema;
pub mod writer;

/// Commonly used types
pub mod prelude {
    pub use crate::compression::CompressionMethod;
    pub use crate::schema::{
        Checksum, Checksums, ColumnType, NameAndType, NamesAndTypesList, ScalarType, SchemaError,
        SortColumn, SortDescription,
    };
    pub use crate::writer::{
        ColumnOnlyWriter, FinishedPart, MergeMode, MergedPartWriter, Storage, WriterConfig,
        WriterError, WriterStats,
    };
}
