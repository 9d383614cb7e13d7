//! Stream resolution and the mark-emission loop shared by both part writers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use arrow::array::Array;

use crate::schema::serialization::{as_list, element_range};
use crate::schema::{
    array_sizes_file_name, array_sizes_stream_name, escape_for_file_name, serialize_array_sizes,
    serialize_null_map, serialize_range, Checksums, ColumnType, SchemaError,
};

use super::config::WriterConfig;
use super::error::WriterError;
use super::stream::{ColumnStream, CompressedFileWriter, StreamKind};

/// Row span covered by one pass of the mark-emission loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granule {
    /// First row
    pub start: usize,
    /// Number of rows, clamped to the rows available
    pub len: usize,
    /// Whether a mark precedes this span; false only for the partial granule
    /// that continues the previous write call
    pub starts_mark: bool,
}

impl Granule {
    /// Rows covered, as a range
    pub fn rows(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Split `rows` rows into granules, continuing a granule left open by the
/// previous call when `index_offset` is non-zero.
///
/// ```
/// use mergepart::writer::plan_granules;
///
/// let granules = plan_granules(7, 0, 3);
/// assert_eq!(granules.len(), 3);
/// assert!(granules.iter().all(|g| g.starts_mark));
///
/// let continued = plan_granules(3, 2, 3);
/// assert!(!continued[0].starts_mark);
/// assert_eq!(continued[0].len, 2);
/// ```
pub fn plan_granules(rows: usize, index_offset: usize, index_granularity: usize) -> Vec<Granule> {
    let mut granules = Vec::with_capacity(rows / index_granularity.max(1) + 2);
    let mut prev_mark = 0;
    while prev_mark < rows {
        let (limit, starts_mark) = if prev_mark == 0 && index_offset != 0 {
            (index_offset, false)
        } else {
            (index_granularity, true)
        };
        granules.push(Granule {
            start: prev_mark,
            len: limit.min(rows - prev_mark),
            starts_mark,
        });
        prev_mark += limit;
    }
    granules
}

/// Index offset carried into the next call after writing `rows` rows
pub fn next_index_offset(index_offset: usize, rows: usize, index_granularity: usize) -> usize {
    let leftover = (index_granularity - index_offset + rows) % index_granularity;
    (index_granularity - leftover) % index_granularity
}

/// Column streams of one part and the state shared across write calls
pub struct PartWriterCore {
    part_path: PathBuf,
    config: WriterConfig,
    aio_threshold: u64,
    column_streams: BTreeMap<String, ColumnStream>,
    null_streams: BTreeMap<String, ColumnStream>,
    sizes_roots: HashMap<String, String>,
    index_offset: usize,
}

impl PartWriterCore {
    /// Core writing into `part_path`; the directory must exist
    pub fn new(part_path: impl Into<PathBuf>, config: WriterConfig, aio_threshold: u64) -> Self {
        Self {
            part_path: part_path.into(),
            config,
            aio_threshold,
            column_streams: BTreeMap::new(),
            null_streams: BTreeMap::new(),
            sizes_roots: HashMap::new(),
            index_offset: 0,
        }
    }

    /// Part directory
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Writer settings
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Estimated stream size at which the direct I/O buffer is used (0 disables)
    pub fn aio_threshold(&self) -> u64 {
        self.aio_threshold
    }

    /// Rows still missing from the granule left open by the last call
    pub fn index_offset(&self) -> usize {
        self.index_offset
    }

    /// Granules of the next call of `rows` rows
    pub fn plan(&self, rows: usize) -> Vec<Granule> {
        plan_granules(rows, self.index_offset, self.config.index_granularity)
    }

    /// Advance the granule clock after a call of `rows` rows
    pub fn advance(&mut self, rows: usize) {
        self.index_offset =
            next_index_offset(self.index_offset, rows, self.config.index_granularity);
    }

    /// Data and sizes streams, by stream name
    pub fn column_streams(&self) -> &BTreeMap<String, ColumnStream> {
        &self.column_streams
    }

    /// Null-map streams, by column name
    pub fn null_streams(&self) -> &BTreeMap<String, ColumnStream> {
        &self.null_streams
    }

    fn create_stream(
        &self,
        file_base: &str,
        kind: StreamKind,
        estimated_size: u64,
    ) -> io::Result<ColumnStream> {
        ColumnStream::create(
            &self.part_path,
            file_base,
            kind,
            self.config.compression,
            self.config.max_compress_block_size,
            estimated_size,
            self.aio_threshold,
        )
    }

    /// Create the streams of column `name` of type `column_type`.
    ///
    /// Array sizes streams are keyed by nested structure and level, so sibling
    /// columns reuse the stream created by the first of them. A file name
    /// override also renames the sizes streams, which then belong to the
    /// nested structure of the override.
    pub fn add_stream(
        &mut self,
        name: &str,
        column_type: &ColumnType,
        estimated_size: u64,
        level: usize,
        file_name_override: Option<&str>,
    ) -> Result<(), WriterError> {
        match column_type {
            ColumnType::Nullable(inner) => {
                if !matches!(inner.as_ref(), ColumnType::Scalar(_)) {
                    return Err(SchemaError::InvalidType(format!(
                        "column '{}': {} is not allowed, only scalar types can be nullable",
                        name, column_type
                    ))
                    .into());
                }
                let file_base = escape_for_file_name(file_name_override.unwrap_or(name));
                let stream = self.create_stream(&file_base, StreamKind::NullMap, estimated_size)?;
                self.null_streams.insert(name.to_string(), stream);
                self.add_stream(name, inner, estimated_size, level, file_name_override)
            }
            ColumnType::Array(element) => {
                let sizes_root = match file_name_override {
                    Some(root) => {
                        self.sizes_roots.insert(name.to_string(), root.to_string());
                        root
                    }
                    None => name,
                };
                let sizes_name = array_sizes_stream_name(sizes_root, level);
                if !self.column_streams.contains_key(&sizes_name) {
                    let file_base = array_sizes_file_name(sizes_root, level);
                    let stream = self.create_stream(&file_base, StreamKind::Data, estimated_size)?;
                    self.column_streams.insert(sizes_name, stream);
                }
                self.add_stream(name, element, estimated_size, level + 1, file_name_override)
            }
            ColumnType::Scalar(_) => {
                let file_base = escape_for_file_name(file_name_override.unwrap_or(name));
                let stream = self.create_stream(&file_base, StreamKind::Data, estimated_size)?;
                self.column_streams.insert(name.to_string(), stream);
                Ok(())
            }
        }
    }

    /// Write `array` (all rows of the current call) into the streams of `name`.
    ///
    /// `offset_columns` collects the sizes streams already written in this
    /// call; it must be fresh for every call.
    pub fn write_column(
        &mut self,
        name: &str,
        column_type: &ColumnType,
        array: &dyn Array,
        granules: &[Granule],
        offset_columns: &mut HashSet<String>,
    ) -> Result<(), WriterError> {
        self.write_data(name, column_type, array, granules, offset_columns, 0)
    }

    fn write_data(
        &mut self,
        name: &str,
        column_type: &ColumnType,
        array: &dyn Array,
        granules: &[Granule],
        offset_columns: &mut HashSet<String>,
        level: usize,
    ) -> Result<(), WriterError> {
        let min_block = self.config.min_compress_block_size;
        match column_type {
            ColumnType::Nullable(inner) => {
                let stream = self
                    .null_streams
                    .get_mut(name)
                    .ok_or_else(|| WriterError::StreamNotFound(format!("null map of {}", name)))?;
                write_granules(stream, granules, min_block, |out, rows| {
                    serialize_null_map(array, rows, out)
                })?;
                self.write_data(name, inner, array, granules, offset_columns, level)
            }
            ColumnType::Array(element) => {
                let list = as_list(array)?;
                let sizes_root = self.sizes_roots.get(name).map_or(name, String::as_str);
                let sizes_name = array_sizes_stream_name(sizes_root, level);
                if !offset_columns.contains(&sizes_name) {
                    let stream = self
                        .column_streams
                        .get_mut(&sizes_name)
                        .ok_or_else(|| WriterError::StreamNotFound(sizes_name.clone()))?;
                    write_granules(stream, granules, min_block, |out, rows| {
                        serialize_array_sizes(list, rows, out)
                    })?;
                    offset_columns.insert(sizes_name);
                }

                let element_granules: Vec<Granule> = granules
                    .iter()
                    .map(|granule| {
                        let elements = element_range(list, granule.rows());
                        Granule {
                            start: elements.start,
                            len: elements.len(),
                            starts_mark: granule.starts_mark,
                        }
                    })
                    .collect();
                self.write_data(
                    name,
                    element,
                    list.values().as_ref(),
                    &element_granules,
                    offset_columns,
                    level + 1,
                )
            }
            ColumnType::Scalar(scalar) => {
                let stream = self
                    .column_streams
                    .get_mut(name)
                    .ok_or_else(|| WriterError::StreamNotFound(name.to_string()))?;
                write_granules(stream, granules, min_block, |out, rows| {
                    serialize_range(array, *scalar, rows, out)
                })
            }
        }
    }

    /// Finalize data and sizes streams into `checksums`, optionally syncing them
    pub fn finalize_column_streams(
        &mut self,
        checksums: &mut Checksums,
        sync: bool,
    ) -> Result<(), WriterError> {
        finalize_all(std::mem::take(&mut self.column_streams), checksums, sync)
    }

    /// Finalize null-map streams into `checksums`, optionally syncing them
    pub fn finalize_null_streams(
        &mut self,
        checksums: &mut Checksums,
        sync: bool,
    ) -> Result<(), WriterError> {
        finalize_all(std::mem::take(&mut self.null_streams), checksums, sync)
    }
}

fn finalize_all(
    streams: BTreeMap<String, ColumnStream>,
    checksums: &mut Checksums,
    sync: bool,
) -> Result<(), WriterError> {
    for (_, mut stream) in streams {
        stream.finalize()?;
        if sync {
            stream.sync()?;
        }
        stream.add_to_checksums(checksums);
    }
    Ok(())
}

/// Run the mark-emission loop over one stream.
///
/// Before every mark a block holding at least `min_compress_block_size` bytes
/// is closed, and after every granule a block that ended exactly at the
/// current position is rolled over, so marks always point at a block start or
/// inside a block, never at its end.
fn write_granules<F>(
    stream: &mut ColumnStream,
    granules: &[Granule],
    min_compress_block_size: usize,
    mut serialize: F,
) -> Result<(), WriterError>
where
    F: FnMut(&mut CompressedFileWriter, Range<usize>) -> Result<(), SchemaError>,
{
    for granule in granules {
        if granule.starts_mark {
            stream.flush_block_if_needed(min_compress_block_size)?;
            stream.write_mark()?;
        }
        serialize(stream.data(), granule.rows())?;
        stream.next_if_at_end()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(granules: &[Granule]) -> Vec<(usize, bool)> {
        granules.iter().map(|g| (g.len, g.starts_mark)).collect()
    }

    #[test]
    fn test_plan_single_call() {
        assert_eq!(
            lens(&plan_granules(7, 0, 3)),
            vec![(3, true), (3, true), (1, true)]
        );
        assert_eq!(lens(&plan_granules(6, 0, 3)), vec![(3, true), (3, true)]);
        assert!(plan_granules(0, 0, 3).is_empty());
    }

    #[test]
    fn test_plan_continues_open_granule() {
        assert_eq!(lens(&plan_granules(3, 2, 3)), vec![(2, false), (1, true)]);
        assert_eq!(lens(&plan_granules(1, 2, 3)), vec![(1, false)]);
        assert!(plan_granules(0, 2, 3).is_empty());
    }

    #[test]
    fn test_index_offset_recurrence() {
        assert_eq!(next_index_offset(0, 4, 3), 2);
        assert_eq!(next_index_offset(2, 3, 3), 2);
        assert_eq!(next_index_offset(0, 6, 3), 0);
        assert_eq!(next_index_offset(2, 1, 3), 1);
        assert_eq!(next_index_offset(2, 0, 3), 2);
        assert_eq!(next_index_offset(0, 0, 3), 0);
    }

    #[test]
    fn test_split_marks_match_single_call() {
        let granularity = 4;
        let single: Vec<usize> = plan_granules(19, 0, granularity)
            .iter()
            .filter(|g| g.starts_mark)
            .map(|g| g.start)
            .collect();

        let mut split = Vec::new();
        let mut offset = 0;
        let mut base = 0;
        for rows in [5, 1, 7, 6] {
            for granule in plan_granules(rows, offset, granularity) {
                if granule.starts_mark {
                    split.push(base + granule.start);
                }
            }
            offset = next_index_offset(offset, rows, granularity);
            base += rows;
        }

        assert_eq!(single, split);
    }
}
