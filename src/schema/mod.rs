//! # Part Schema and Metadata Formats
//!
//! This module describes what a part stores and how its metadata files look.
//!
//! ## Column Types
//!
//! | Type | Streams |
//! |------|---------|
//! | `UInt8` .. `Int64`, `Float32`, `Float64` | one data stream, fixed-width LE values |
//! | `String` | one data stream, varint length + bytes |
//! | `Array(T)` | shared sizes stream (`<root>.size<level>`) + streams of `T` |
//! | `Nullable(T)` | null-map stream (`.null.bin`) + streams of `T` |
//!
//! `Nullable` may only wrap a scalar type.
//!
//! ## Metadata Files
//!
//! - `columns.txt`: [`NamesAndTypesList`]
//! - `checksums.txt`: [`Checksums`]
//! - `primary.idx`: key values serialized with [`serialize_value`]
//!
//! ## Nested Columns
//!
//! Columns named `root.member` belong to the nested structure `root`. Array
//! columns of one nested structure share their sizes streams, so the element
//! counts of `n.a` and `n.b` are stored once.

mod builders;
mod checksums;
mod column_type;
/// Column list and its `columns.txt` form.
pub mod columns;
mod constants;
mod error;
mod names;
/// Binary value serialization.
pub mod serialization;
mod sort;
mod validation;

#[cfg(test)]
mod tests;

pub use builders::{
    create_arrow_schema, create_arrow_schema_arc, names_and_types_from_schema,
    COLUMN_TYPE_METADATA_KEY,
};
pub use checksums::{checksum_file, Checksum, Checksums};
pub use column_type::{ColumnType, ScalarType};
pub use columns::{NameAndType, NamesAndTypesList};
pub use constants::*;
pub use error::SchemaError;
pub use names::{
    array_sizes_file_name, array_sizes_stream_name, escape_for_file_name,
    extract_nested_table_name, unescape_for_file_name,
};
pub use serialization::{
    serialize_array_sizes, serialize_null_map, serialize_range, serialize_value,
};
pub use sort::{SortColumn, SortDescription};
pub use validation::{validate_schema, SchemaValidationError};
