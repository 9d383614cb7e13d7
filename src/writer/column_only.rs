use std::collections::{HashMap, HashSet};
use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::schema::{
    names_and_types_from_schema, validate_schema, Checksums, NameAndType, NamesAndTypesList,
};

use super::config::Storage;
use super::core::PartWriterCore;
use super::error::WriterError;
use super::stats::WriterStats;

/// Adds columns to an existing part.
///
/// Streams are created from the columns of the first batch. Declared types
/// come from the storage column list when it names the column, otherwise from
/// the Arrow field. No primary index is written and the part directory is
/// never removed, even when no rows arrive.
pub struct ColumnOnlyWriter {
    core: PartWriterCore,
    storage_columns: NamesAndTypesList,
    columns: Option<NamesAndTypesList>,
    file_names: HashMap<String, String>,
    column_sizes: HashMap<String, u64>,
    sync: bool,
    stats: WriterStats,
}

impl ColumnOnlyWriter {
    /// Writer adding columns to the part at `part_path`; `sync` forces every
    /// file to stable storage on [`finish`](Self::finish)
    pub fn new<P: AsRef<Path>>(
        storage: &Storage,
        part_path: P,
        sync: bool,
    ) -> Result<Self, WriterError> {
        storage.config.validate()?;
        Ok(Self {
            core: PartWriterCore::new(
                part_path.as_ref(),
                storage.config.clone(),
                storage.config.aio_threshold,
            ),
            storage_columns: storage.columns.clone(),
            columns: None,
            file_names: HashMap::new(),
            column_sizes: HashMap::new(),
            sync,
            stats: WriterStats::default(),
        })
    }

    /// Store column `name` under a different file name, so that a column
    /// rewritten next to its old files does not overwrite them.
    ///
    /// An array column without an override shares the sizes streams of its
    /// nested structure, so adding `n.c` to a part that already has `n.a`
    /// rewrites `n.size0`. With an override the sizes streams are named after
    /// the override instead.
    pub fn with_file_names(mut self, file_names: HashMap<String, String>) -> Self {
        self.file_names = file_names;
        self
    }

    /// Estimated on-disk size per column, checked against the configured
    /// direct I/O threshold when the column's streams are created
    pub fn with_column_sizes(mut self, column_sizes: HashMap<String, u64>) -> Self {
        self.column_sizes = column_sizes;
        self
    }

    /// Part directory
    pub fn part_path(&self) -> &Path {
        self.core.part_path()
    }

    pub(crate) fn core(&self) -> &PartWriterCore {
        &self.core
    }

    /// Columns resolved from the first batch
    pub fn columns(&self) -> Option<&NamesAndTypesList> {
        self.columns.as_ref()
    }

    /// Statistics so far
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Write a batch of the added columns, in the row order of the part
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        if self.columns.is_none() {
            let resolved = self.resolve_columns(batch)?;
            for column in &resolved {
                let file_name = self.file_names.get(&column.name).map(String::as_str);
                let estimated = self.column_sizes.get(&column.name).copied().unwrap_or(0);
                self.core
                    .add_stream(&column.name, &column.column_type, estimated, 0, file_name)?;
            }
            log::debug!(
                "Adding {} columns to part {}",
                resolved.len(),
                self.core.part_path().display()
            );
            self.columns = Some(resolved);
        }

        let Some(columns) = self.columns.as_ref() else {
            return Err(WriterError::StreamNotFound(
                "columns were not resolved".to_string(),
            ));
        };
        validate_schema(batch.schema_ref(), columns)?;

        let rows = batch.num_rows();
        let granules = self.core.plan(rows);
        let mut offset_columns = HashSet::new();

        for column in columns {
            let array = batch
                .column_by_name(&column.name)
                .ok_or_else(|| WriterError::ColumnNotFound(column.name.clone()))?;
            self.core.write_column(
                &column.name,
                &column.column_type,
                array.as_ref(),
                &granules,
                &mut offset_columns,
            )?;
        }

        self.stats.marks_written += granules.iter().filter(|g| g.starts_mark).count();
        self.core.advance(rows);
        self.stats.batches_written += 1;
        self.stats.rows_written += rows;
        Ok(())
    }

    fn resolve_columns(&self, batch: &RecordBatch) -> Result<NamesAndTypesList, WriterError> {
        let derived = names_and_types_from_schema(batch.schema_ref())?;
        Ok(derived
            .iter()
            .map(|column| match self.storage_columns.get(&column.name) {
                Some(declared) => declared.clone(),
                None => NameAndType::new(column.name.clone(), column.column_type.clone()),
            })
            .collect())
    }

    /// Not supported: the column list of the part is owned by its original writer
    pub fn write_suffix(&mut self) -> Result<(), WriterError> {
        Err(WriterError::Unsupported(
            "write_suffix is not supported by ColumnOnlyWriter, use finish".to_string(),
        ))
    }

    /// Finalize every stream and return the checksums of the files written.
    ///
    /// Null-map streams are finalized first, then data and sizes streams.
    pub fn finish(mut self) -> Result<Checksums, WriterError> {
        let mut checksums = Checksums::new();
        self.core.finalize_null_streams(&mut checksums, self.sync)?;
        self.core.finalize_column_streams(&mut checksums, self.sync)?;

        log::info!(
            "Added {} files to part {}: {}",
            checksums.len(),
            self.core.part_path().display(),
            self.stats
        );
        Ok(checksums)
    }
}
