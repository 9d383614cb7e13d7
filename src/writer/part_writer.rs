use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, UInt32Array, UInt64Array};
use arrow::compute::{concat, take};
use arrow::record_batch::RecordBatch;
use byteorder::WriteBytesExt;

use crate::compression::{HashingWriter, WriteBufferFromFile, DEFAULT_BUFFER_SIZE};
use crate::schema::{
    serialize_value, validate_schema, Checksum, Checksums, ColumnType, NamesAndTypesList,
    SortColumn, SortDescription, CHECKSUMS_FILE, COLUMNS_FILE, PRIMARY_INDEX_FILE,
};

use super::config::{MergeMode, Storage, WriterConfig};
use super::core::PartWriterCore;
use super::error::WriterError;
use super::stats::WriterStats;

/// Result of finalizing a part
#[derive(Debug, Clone)]
pub struct FinishedPart {
    /// Checksums of every file in the part; empty if the part was removed
    pub checksums: Checksums,
    /// Primary index, one array per key column, one value per mark
    pub index: Vec<ArrayRef>,
    /// Number of marks (granules) written
    pub marks_count: usize,
    /// Write statistics
    pub stats: WriterStats,
}

impl FinishedPart {
    /// Whether the part had no rows and its directory was removed
    pub fn is_empty(&self) -> bool {
        self.marks_count == 0
    }
}

/// Writes sorted batches into a new part directory.
///
/// The writer owns the part for its whole lifetime: [`finish`](Self::finish)
/// consumes it, so a part is finalized exactly once and cannot be written to
/// afterwards.
///
/// # Example
///
/// ```no_run
/// use mergepart::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let columns = NamesAndTypesList::new().with("id", ScalarType::UInt64.into());
/// let storage = Storage::new(columns.clone(), SortDescription::by_names(["id"]));
///
/// let mut writer = MergedPartWriter::new(&storage, "/tmp/part_1_1_0", columns)?;
/// # let batch: arrow::record_batch::RecordBatch = unimplemented!();
/// writer.write(&batch)?;
/// let part = writer.finish()?;
/// println!("{}", part.stats);
/// # Ok(())
/// # }
/// ```
pub struct MergedPartWriter {
    core: PartWriterCore,
    columns: NamesAndTypesList,
    sort_description: SortDescription,
    merge_mode: MergeMode,
    index_file: Option<HashingWriter<WriteBufferFromFile>>,
    index_columns: Vec<ArrayRef>,
    marks_count: usize,
    stats: WriterStats,
}

impl MergedPartWriter {
    /// Create the part directory and the streams of every column in `columns`.
    ///
    /// The direct I/O threshold comes from the storage config.
    pub fn new<P: AsRef<Path>>(
        storage: &Storage,
        part_path: P,
        columns: NamesAndTypesList,
    ) -> Result<Self, WriterError> {
        Self::with_column_sizes(
            storage,
            part_path,
            columns,
            &HashMap::new(),
            storage.config.aio_threshold,
        )
    }

    /// Like [`new`](Self::new), with per-column size estimates.
    ///
    /// Columns whose estimate reaches `aio_threshold` (when non-zero) get the
    /// large direct I/O write buffer.
    pub fn with_column_sizes<P: AsRef<Path>>(
        storage: &Storage,
        part_path: P,
        columns: NamesAndTypesList,
        column_sizes: &HashMap<String, u64>,
        aio_threshold: u64,
    ) -> Result<Self, WriterError> {
        storage.config.validate()?;
        check_sort_names(&storage.sort_description)?;

        let part_path = part_path.as_ref().to_path_buf();
        fs::create_dir_all(&part_path)?;

        let index_file = if storage.merge_mode.is_sorted() {
            Some(HashingWriter::new(WriteBufferFromFile::create(
                part_path.join(PRIMARY_INDEX_FILE),
                DEFAULT_BUFFER_SIZE,
            )?))
        } else {
            None
        };

        let mut core = PartWriterCore::new(&part_path, storage.config.clone(), aio_threshold);
        for column in &columns {
            let estimated = column_sizes.get(&column.name).copied().unwrap_or(0);
            core.add_stream(&column.name, &column.column_type, estimated, 0, None)?;
        }

        log::debug!(
            "Opened part {} with {} columns ({} mode)",
            part_path.display(),
            columns.len(),
            storage.merge_mode
        );

        Ok(Self {
            core,
            columns,
            sort_description: storage.sort_description.clone(),
            merge_mode: storage.merge_mode,
            index_file,
            index_columns: Vec::new(),
            marks_count: 0,
            stats: WriterStats::default(),
        })
    }

    /// Part directory
    pub fn part_path(&self) -> &Path {
        self.core.part_path()
    }

    pub(crate) fn core(&self) -> &PartWriterCore {
        &self.core
    }

    /// Primary index accumulated so far
    pub fn index(&self) -> &[ArrayRef] {
        &self.index_columns
    }

    /// Marks written so far
    pub fn marks_count(&self) -> usize {
        self.marks_count
    }

    /// Statistics so far
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Writer settings
    pub fn config(&self) -> &WriterConfig {
        self.core.config()
    }

    /// Write a batch whose rows are already in key order
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        self.write_impl(batch, None)
    }

    /// Write a batch whose key order is given by `permutation`.
    ///
    /// Key columns are permuted up front; every other column is permuted just
    /// before it is serialized and dropped right after.
    pub fn write_with_permutation(
        &mut self,
        batch: &RecordBatch,
        permutation: &UInt32Array,
    ) -> Result<(), WriterError> {
        check_permutation(batch.num_rows(), permutation)?;
        self.write_impl(batch, Some(permutation))
    }

    /// Writing only the column list without merged data is not supported by
    /// this writer.
    pub fn write_suffix(&mut self) -> Result<(), WriterError> {
        Err(WriterError::Unsupported(
            "write_suffix is not supported by MergedPartWriter, use finish".to_string(),
        ))
    }

    fn write_impl(
        &mut self,
        batch: &RecordBatch,
        permutation: Option<&UInt32Array>,
    ) -> Result<(), WriterError> {
        validate_schema(batch.schema_ref(), &self.columns)?;

        let rows = batch.num_rows();
        let key_columns = self.resolve_key_columns(batch, permutation)?;

        let granules = self.core.plan(rows);
        let mut offset_columns = HashSet::new();

        for column in &self.columns {
            let position = batch
                .schema_ref()
                .index_of(&column.name)
                .map_err(|_| WriterError::ColumnNotFound(column.name.clone()))?;

            if let Some(key) = key_columns.iter().find(|key| key.position == position) {
                self.core.write_column(
                    &column.name,
                    &column.column_type,
                    key.array.as_ref(),
                    &granules,
                    &mut offset_columns,
                )?;
                continue;
            }

            let original = batch.column(position);
            let permuted;
            let array: &dyn Array = match permutation {
                Some(indices) => {
                    permuted = take(original.as_ref(), indices, None)?;
                    permuted.as_ref()
                }
                None => original.as_ref(),
            };
            self.core.write_column(
                &column.name,
                &column.column_type,
                array,
                &granules,
                &mut offset_columns,
            )?;
        }

        self.write_index(&key_columns, rows)?;
        self.core.advance(rows);

        self.stats.batches_written += 1;
        self.stats.rows_written += rows;
        Ok(())
    }

    /// Resolve sort-key columns of `batch`, permuted when a permutation is given
    fn resolve_key_columns(
        &self,
        batch: &RecordBatch,
        permutation: Option<&UInt32Array>,
    ) -> Result<Vec<KeyColumn>, WriterError> {
        let schema = batch.schema_ref();
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(self.sort_description.len());

        for sort_column in self.sort_description.columns() {
            let position = match sort_column {
                SortColumn::Name(name) => schema
                    .index_of(name)
                    .map_err(|_| WriterError::ColumnNotFound(name.clone()))?,
                SortColumn::Position(position) => {
                    if *position >= batch.num_columns() {
                        return Err(WriterError::ColumnNotFound(sort_column.to_string()));
                    }
                    *position
                }
            };

            let field = schema.field(position);
            if !seen.insert(field.name().clone()) {
                return Err(WriterError::DuplicatePrimaryKeyColumn(field.name().clone()));
            }

            let column_type = match self.columns.get(field.name()) {
                Some(column) => column.column_type.clone(),
                None => ColumnType::from_arrow_field(field)?,
            };
            if column_type.array_depth() > 0 {
                return Err(WriterError::Unsupported(format!(
                    "array column '{}' in primary key",
                    field.name()
                )));
            }

            let array = match permutation {
                Some(indices) => take(batch.column(position).as_ref(), indices, None)?,
                None => Arc::clone(batch.column(position)),
            };

            keys.push(KeyColumn {
                position,
                column_type,
                array,
            });
        }

        Ok(keys)
    }

    /// Record the key of every granule start in this call
    fn write_index(&mut self, key_columns: &[KeyColumn], rows: usize) -> Result<(), WriterError> {
        let granularity = self.core.config().index_granularity;
        let starts: Vec<usize> = (self.core.index_offset()..rows).step_by(granularity).collect();
        self.marks_count += starts.len();

        if !self.merge_mode.is_sorted() || starts.is_empty() {
            return Ok(());
        }

        if let Some(index_file) = self.index_file.as_mut() {
            for &row in &starts {
                for key in key_columns {
                    write_key_value(index_file, &key.column_type, key.array.as_ref(), row)?;
                }
            }
        }

        let starts = UInt64Array::from_iter_values(starts.into_iter().map(|row| row as u64));
        let mut index_columns = Vec::with_capacity(key_columns.len());
        for (i, key) in key_columns.iter().enumerate() {
            let values = take(key.array.as_ref(), &starts, None)?;
            let merged = match self.index_columns.get(i) {
                Some(existing) => concat(&[existing.as_ref(), values.as_ref()])?,
                None => values,
            };
            index_columns.push(merged);
        }
        self.index_columns = index_columns;
        Ok(())
    }

    /// Finalize every stream and write the part metadata.
    ///
    /// A part that never received a mark is removed from disk and an empty
    /// manifest is returned.
    pub fn finish(mut self) -> Result<FinishedPart, WriterError> {
        let mut checksums = Checksums::new();

        if let Some(mut index_file) = self.index_file.take() {
            std::io::Write::flush(&mut index_file)?;
            checksums.insert(
                PRIMARY_INDEX_FILE,
                Checksum::plain(index_file.count(), index_file.hash()),
            );
        }

        self.core.finalize_column_streams(&mut checksums, false)?;
        self.core.finalize_null_streams(&mut checksums, false)?;

        let part_path: PathBuf = self.core.part_path().to_path_buf();
        self.stats.marks_written = self.marks_count;

        if self.marks_count == 0 {
            log::warn!(
                "Removing empty part {}: no rows were written",
                part_path.display()
            );
            fs::remove_dir_all(&part_path)?;
            return Ok(FinishedPart {
                checksums: Checksums::new(),
                index: self.index_columns,
                marks_count: 0,
                stats: self.stats,
            });
        }

        self.columns
            .write_text(fs::File::create(part_path.join(COLUMNS_FILE))?)?;
        checksums.write_text(fs::File::create(part_path.join(CHECKSUMS_FILE))?)?;

        self.stats.files_written = checksums.len();
        self.stats.bytes_on_disk = checksums.total_size();
        log::info!("Finished part {}: {}", part_path.display(), self.stats);

        Ok(FinishedPart {
            checksums,
            index: self.index_columns,
            marks_count: self.marks_count,
            stats: self.stats,
        })
    }
}

struct KeyColumn {
    position: usize,
    column_type: ColumnType,
    array: ArrayRef,
}

fn check_sort_names(sort_description: &SortDescription) -> Result<(), WriterError> {
    let mut seen = HashSet::new();
    for column in sort_description.columns() {
        if let SortColumn::Name(name) = column {
            if !seen.insert(name.as_str()) {
                return Err(WriterError::DuplicatePrimaryKeyColumn(name.clone()));
            }
        }
    }
    Ok(())
}

fn check_permutation(rows: usize, permutation: &UInt32Array) -> Result<(), WriterError> {
    if permutation.len() != rows {
        return Err(WriterError::InvalidPermutation(format!(
            "permutation has {} entries for {} rows",
            permutation.len(),
            rows
        )));
    }
    if permutation.null_count() > 0 {
        return Err(WriterError::InvalidPermutation(
            "permutation contains nulls".to_string(),
        ));
    }
    if let Some(&bad) = permutation.values().iter().find(|&&i| i as usize >= rows) {
        return Err(WriterError::InvalidPermutation(format!(
            "index {} out of bounds for {} rows",
            bad, rows
        )));
    }
    Ok(())
}

/// Serialize one key value; nullable keys are prefixed with their null flag
fn write_key_value<W: std::io::Write>(
    out: &mut W,
    column_type: &ColumnType,
    array: &dyn Array,
    row: usize,
) -> Result<(), WriterError> {
    if column_type.is_nullable() {
        out.write_u8(u8::from(array.is_null(row)))?;
    }
    serialize_value(array, column_type.leaf(), row, out)?;
    Ok(())
}
